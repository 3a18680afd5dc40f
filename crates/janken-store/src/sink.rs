//! The result sink boundary.
//!
//! The session core calls [`ResultSink::record`] once per concluded round,
//! fire-and-forget: the caller spawns the future and a failure is logged,
//! never retried and never surfaced to participants.

use async_trait::async_trait;
use tracing::debug;

use crate::errors::{Result, StoreError};
use crate::results::{MatchRecord, MatchResultRepo};

/// Durable (best-effort) storage of finished-match records.
#[async_trait]
pub trait ResultSink: Send + Sync + 'static {
    /// Persist one record.
    async fn record(&self, record: MatchRecord) -> Result<()>;
}

/// `SQLite`-backed sink. Writes happen on the blocking pool since `rusqlite`
/// is synchronous.
pub struct SqliteResultSink {
    repo: MatchResultRepo,
}

impl SqliteResultSink {
    /// Create a sink over an already-migrated pool.
    #[must_use]
    pub fn new(repo: MatchResultRepo) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl ResultSink for SqliteResultSink {
    async fn record(&self, record: MatchRecord) -> Result<()> {
        let repo = self.repo.clone();
        let outcome = record.outcome.clone();
        tokio::task::spawn_blocking(move || repo.insert(&record))
            .await
            .map_err(|e| StoreError::Migration {
                message: format!("persistence task join: {e}"),
            })??;
        debug!(outcome, "match record persisted");
        Ok(())
    }
}

/// Sink that drops every record. Used when persistence is disabled and in
/// tests that only care about the session core.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullResultSink;

#[async_trait]
impl ResultSink for NullResultSink {
    async fn record(&self, _record: MatchRecord) -> Result<()> {
        Ok(())
    }
}
