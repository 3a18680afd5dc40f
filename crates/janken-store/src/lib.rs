//! # janken-store
//!
//! Best-effort persistence of finished-match records.
//!
//! The session core hands a [`MatchRecord`] to a [`ResultSink`] after every
//! resolved round and never waits for, retries, or reads back the write.
//! The SQLite implementation sits behind an `r2d2` connection pool with WAL
//! mode enabled.

#![deny(unsafe_code)]

pub mod connection;
pub mod errors;
pub mod results;
pub mod sink;

pub use connection::{ConnectionPool, PoolConfig, new_file, new_in_memory};
pub use errors::StoreError;
pub use results::{MatchRecord, MatchResultRepo, run_migrations};
pub use sink::{NullResultSink, ResultSink, SqliteResultSink};
