//! Move set and outcome rules.
//!
//! Three legal moves with wire codes 1–3 and the cyclic beats table:
//! Rock beats Scissors, Scissors beats Paper, Paper beats Rock.
//! [`Outcome`] carries the canonical labels used on the wire and in
//! persisted match records, including the timeout default wins.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three legal moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Move {
    /// Wire code 1.
    Rock,
    /// Wire code 2.
    Paper,
    /// Wire code 3.
    Scissors,
}

impl Move {
    /// Parse a wire code. Anything outside {1, 2, 3} is an invalid move.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Rock),
            2 => Some(Self::Paper),
            3 => Some(Self::Scissors),
            _ => None,
        }
    }

    /// The wire code for this move.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Rock => 1,
            Self::Paper => 2,
            Self::Scissors => 3,
        }
    }

    /// Human-readable name.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Rock => "Rock",
            Self::Paper => "Paper",
            Self::Scissors => "Scissors",
        }
    }

    /// Whether this move beats `other` under the cyclic table.
    #[must_use]
    pub fn beats(self, other: Self) -> bool {
        matches!(
            (self, other),
            (Self::Rock, Self::Scissors)
                | (Self::Scissors, Self::Paper)
                | (Self::Paper, Self::Rock)
        )
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of one round, by seat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Seat 1's move beat seat 2's.
    Seat1Wins,
    /// Seat 2's move beat seat 1's.
    Seat2Wins,
    /// Both seats played the same move.
    Tie,
    /// Deadline fired with only seat 1 having moved.
    Seat1WinsByDefault,
    /// Deadline fired with only seat 2 having moved.
    Seat2WinsByDefault,
}

impl Outcome {
    /// Canonical outcome label, as broadcast and as persisted.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Seat1Wins => "Player 1 wins",
            Self::Seat2Wins => "Player 2 wins",
            Self::Tie => "Tie",
            Self::Seat1WinsByDefault => "Player 1 wins by default",
            Self::Seat2WinsByDefault => "Player 2 wins by default",
        }
    }

    /// Decide a round where both moves are present.
    #[must_use]
    pub fn decide(seat1: Move, seat2: Move) -> Self {
        if seat1 == seat2 {
            Self::Tie
        } else if seat1.beats(seat2) {
            Self::Seat1Wins
        } else {
            Self::Seat2Wins
        }
    }

    /// Decide a round ended by the deadline, where moves may be missing.
    ///
    /// Returns `None` when both moves are present: that round was already
    /// resolved by the move-completion path and the late fire is a no-op.
    #[must_use]
    pub fn decide_on_timeout(seat1: Option<Move>, seat2: Option<Move>) -> Option<Self> {
        match (seat1, seat2) {
            (None, None) => Some(Self::Tie),
            (Some(_), None) => Some(Self::Seat1WinsByDefault),
            (None, Some(_)) => Some(Self::Seat2WinsByDefault),
            (Some(_), Some(_)) => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
