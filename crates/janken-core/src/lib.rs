//! # janken-core
//!
//! Shared types for the janken match server:
//!
//! - Branded id newtypes ([`ids`])
//! - Move set and outcome rules ([`game`])
//! - Wire protocol messages ([`protocol`])
//! - Game error taxonomy ([`errors`])
//!
//! This crate has no async runtime dependency; everything here is plain
//! data plus the pure outcome computation.

#![deny(unsafe_code)]

pub mod errors;
pub mod game;
pub mod ids;
pub mod protocol;

pub use errors::GameError;
pub use game::{Move, Outcome};
pub use ids::ConnectionId;
pub use protocol::{ClientCommand, ServerEvent};
