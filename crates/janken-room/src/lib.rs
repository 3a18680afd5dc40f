//! # janken-room
//!
//! The session core: one room holding at most two seats.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `coordinator` | The round state machine — events in, actions out |
//! | `deadline` | Cancellable round deadline timer |
//! | `room` | Serialized event loop: mailbox, transport fan-out, sink handoff |
//!
//! All session state lives in [`coordinator::Coordinator`] and is mutated by
//! exactly one task: the room loop pulls one [`coordinator::RoomEvent`] at a
//! time from its mailbox and applies the resulting actions before accepting
//! the next event. The deadline timer is the only background trigger and it
//! feeds back through the same mailbox, so timer-vs-move races are settled
//! by state inspection, never by timing.

#![deny(unsafe_code)]

pub mod coordinator;
pub mod deadline;
pub mod room;

pub use coordinator::{Action, Coordinator, RoomEvent};
pub use room::{RoomHandle, Transport, spawn_room};
