//! Match record schema and repository.

use chrono::{DateTime, Utc};
use janken_core::game::{Move, Outcome};
use rusqlite::Connection;

use crate::connection::ConnectionPool;
use crate::errors::{Result, StoreError};

/// One finished round, as handed off by the session core.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchRecord {
    /// Seat 1's move, absent when the round timed out without one.
    pub seat1_move: Option<Move>,
    /// Seat 2's move, absent when the round timed out without one.
    pub seat2_move: Option<Move>,
    /// Canonical outcome label.
    pub outcome: String,
    /// When the round resolved.
    pub resolved_at: DateTime<Utc>,
}

impl MatchRecord {
    /// Build a record for a round resolved now.
    #[must_use]
    pub fn new(seat1_move: Option<Move>, seat2_move: Option<Move>, outcome: Outcome) -> Self {
        Self {
            seat1_move,
            seat2_move,
            outcome: outcome.label().to_owned(),
            resolved_at: Utc::now(),
        }
    }
}

/// Create the `match_results` table if it does not exist.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS match_results (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             seat1_move INTEGER,
             seat2_move INTEGER,
             outcome TEXT NOT NULL,
             created_at TEXT NOT NULL
         );
         CREATE INDEX IF NOT EXISTS idx_match_results_created
             ON match_results(created_at);",
    )
    .map_err(|e| StoreError::Migration {
        message: format!("match_results: {e}"),
    })
}

/// Repository over the `match_results` table.
///
/// The session core only inserts; the query surface exists for operational
/// inspection and tests.
#[derive(Clone)]
pub struct MatchResultRepo {
    pool: ConnectionPool,
}

impl MatchResultRepo {
    /// Create a repository over an already-migrated pool.
    #[must_use]
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Insert one finished-match record.
    pub fn insert(&self, record: &MatchRecord) -> Result<()> {
        let conn = self.pool.get()?;
        let _ = conn.execute(
            "INSERT INTO match_results (seat1_move, seat2_move, outcome, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                record.seat1_move.map(|m| i64::from(m.code())),
                record.seat2_move.map(|m| i64::from(m.code())),
                record.outcome,
                record.resolved_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Total persisted records.
    pub fn count(&self) -> Result<i64> {
        let conn = self.pool.get()?;
        let count = conn.query_row("SELECT COUNT(*) FROM match_results", [], |row| row.get(0))?;
        Ok(count)
    }

    /// The most recent outcome labels, newest first.
    pub fn recent_outcomes(&self, limit: u32) -> Result<Vec<String>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT outcome FROM match_results ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map([limit], |row| row.get(0))?;
        let outcomes = rows.collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(outcomes)
    }
}
