//! Game error taxonomy.
//!
//! Every rejected operation maps to one [`GameError`] variant. All of them
//! are unicast to the offending connection as a human-readable reason and
//! leave session state untouched; only [`GameError::CapacityExceeded`]
//! additionally terminates the rejected connection.

use thiserror::Error;

/// A rejected session operation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GameError {
    /// A third connection arrived while two participants are present.
    #[error("Game is full. Only 2 players allowed.")]
    CapacityExceeded,

    /// A join from a participant that already joined this round cycle.
    #[error("You have already joined this round.")]
    DuplicateJoin,

    /// An event from a connection id the session does not know.
    #[error("Unknown participant.")]
    UnknownParticipant,

    /// A move code outside the legal set {1, 2, 3}.
    #[error("Invalid move: expected 1 (Rock), 2 (Paper) or 3 (Scissors).")]
    InvalidMove,

    /// A move from a connection that has not joined the round.
    #[error("Join the round before making a move.")]
    NotJoined,
}

impl GameError {
    /// Whether this error terminates the offending connection.
    #[must_use]
    pub fn is_fatal_for_connection(&self) -> bool {
        matches!(self, Self::CapacityExceeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_message_matches_wire_text() {
        assert_eq!(
            GameError::CapacityExceeded.to_string(),
            "Game is full. Only 2 players allowed."
        );
    }

    #[test]
    fn only_capacity_is_fatal() {
        assert!(GameError::CapacityExceeded.is_fatal_for_connection());
        for err in [
            GameError::DuplicateJoin,
            GameError::UnknownParticipant,
            GameError::InvalidMove,
            GameError::NotJoined,
        ] {
            assert!(!err.is_fatal_for_connection());
        }
    }

    #[test]
    fn reasons_are_human_readable() {
        for err in [
            GameError::DuplicateJoin,
            GameError::UnknownParticipant,
            GameError::InvalidMove,
            GameError::NotJoined,
        ] {
            assert!(!err.to_string().is_empty());
        }
    }
}
