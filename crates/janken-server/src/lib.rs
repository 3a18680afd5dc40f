//! # janken-server
//!
//! The transport boundary: an Axum HTTP server exposing `/health` and the
//! `/ws` WebSocket endpoint. Sockets are parsed into room events here and
//! room actions are fanned back out through the [`ConnectionRegistry`],
//! which implements the room's `Transport` trait. No game rules live in
//! this crate.

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod registry;
pub mod server;
pub mod shutdown;
pub mod ws;

pub use config::ServerConfig;
pub use registry::ConnectionRegistry;
pub use server::{AppState, GameServer};
pub use shutdown::ShutdownCoordinator;
