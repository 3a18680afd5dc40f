//! Error type for the result store.

use thiserror::Error;

/// Errors that can occur while persisting or querying match records.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` database error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Schema migration failed.
    #[error("migration error: {message}")]
    Migration {
        /// Which migration failed and why.
        message: String,
    },
}

/// Convenience alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;
