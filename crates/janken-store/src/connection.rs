//! `SQLite` connection pool with WAL mode enabled.
//!
//! `r2d2` pooling with an `r2d2_sqlite` backend; a customizer applies the
//! pragmas on every new connection.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::time::Duration;

use crate::errors::Result;

/// Alias for the pool type.
pub type ConnectionPool = Pool<SqliteConnectionManager>;

/// Alias for a pooled connection.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Pool configuration.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Maximum pool size (default: 4 — the sink is the only writer).
    pub pool_size: u32,
    /// Busy timeout in milliseconds (default: 5000).
    pub busy_timeout_ms: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pool_size: 4,
            busy_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug)]
struct PragmaCustomizer {
    busy_timeout_ms: u32,
}

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for PragmaCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(&format!(
            "PRAGMA journal_mode = WAL;\
             PRAGMA busy_timeout = {};\
             PRAGMA synchronous = NORMAL;",
            self.busy_timeout_ms
        ))
    }
}

fn build(manager: SqliteConnectionManager, config: &PoolConfig, max_size: u32) -> Result<ConnectionPool> {
    let pool = Pool::builder()
        .max_size(max_size)
        .connection_timeout(Duration::from_secs(5))
        .connection_customizer(Box::new(PragmaCustomizer {
            busy_timeout_ms: config.busy_timeout_ms,
        }))
        .build(manager)?;
    Ok(pool)
}

/// Create an in-memory pool (for testing).
///
/// Capped at one connection: each `SQLite` in-memory connection is its own
/// database, so a larger pool would hand out connections the migration
/// never ran on.
pub fn new_in_memory(config: &PoolConfig) -> Result<ConnectionPool> {
    build(SqliteConnectionManager::memory(), config, 1)
}

/// Create a file-backed pool.
pub fn new_file(path: &str, config: &PoolConfig) -> Result<ConnectionPool> {
    build(SqliteConnectionManager::file(path), config, config.pool_size)
}
