//! Wire protocol messages.
//!
//! Inbound frames are [`ClientCommand`] (tagged `"type"`), outbound frames
//! are [`ServerEvent`] (tagged `"event"`). All field names are camelCase on
//! the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ConnectionId;

/// A command sent by a client over its WebSocket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientCommand {
    /// Opt into the current round cycle.
    Join,
    /// Submit a move for the live round.
    MakeMove {
        /// Wire code of the move (1 = Rock, 2 = Paper, 3 = Scissors).
        #[serde(rename = "move")]
        mv: u8,
    },
}

/// A notification sent by the server, either unicast or broadcast.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Unicast acknowledgment of a successful connect.
    Connected {
        /// The id assigned to this connection.
        connection_id: ConnectionId,
        /// Participants in the room, including this one.
        participant_count: usize,
    },
    /// Unicast acknowledgment of a successful join.
    Joined {
        /// The joining connection's id.
        connection_id: ConnectionId,
        /// Participants in the room.
        participant_count: usize,
    },
    /// Unicast acknowledgment of an accepted move.
    MoveAccepted {
        /// Human-readable name of the accepted move.
        move_text: String,
    },
    /// Unicast rejection with a human-readable reason.
    Error {
        /// Why the command was rejected.
        reason: String,
    },
    /// Broadcast whenever the roster changes.
    RosterUpdate {
        /// Connected participants.
        participant_count: usize,
        /// Participants that have joined the current round cycle.
        joined_count: usize,
    },
    /// Broadcast when the second participant joins and the round goes live.
    RoundStarted {
        /// Display message for clients.
        message: String,
        /// Instant the round started.
        started_at: DateTime<Utc>,
        /// Fixed round length in seconds.
        round_secs: u64,
    },
    /// Broadcast when a round resolves.
    Result {
        /// Seat 1's move code, absent if it never arrived.
        move1: Option<u8>,
        /// Seat 2's move code, absent if it never arrived.
        move2: Option<u8>,
        /// Canonical outcome label.
        outcome: String,
        /// Human-readable seat 1 move.
        move1_text: String,
        /// Human-readable seat 2 move.
        move2_text: String,
        /// Stable display name of seat 1.
        seat1_name: String,
        /// Stable display name of seat 2.
        seat2_name: String,
    },
    /// Broadcast after every resolution or departure.
    RoundReset {
        /// Last outcome summary, or a waiting message.
        message: String,
    },
    /// Broadcast when a participant disconnects.
    PlayerLeft {
        /// Remaining participants.
        participant_count: usize,
        /// Remaining joined participants (always 0 after the forced reset).
        joined_count: usize,
        /// The departed connection's id.
        departed_id: ConnectionId,
    },
}

impl ServerEvent {
    /// The wire tag of this event, for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Joined { .. } => "joined",
            Self::MoveAccepted { .. } => "moveAccepted",
            Self::Error { .. } => "error",
            Self::RosterUpdate { .. } => "rosterUpdate",
            Self::RoundStarted { .. } => "roundStarted",
            Self::Result { .. } => "result",
            Self::RoundReset { .. } => "roundReset",
            Self::PlayerLeft { .. } => "playerLeft",
        }
    }
}
