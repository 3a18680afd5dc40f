//! The round state machine.
//!
//! [`Coordinator`] owns every piece of session state. It consumes one
//! [`RoomEvent`] at a time and returns the [`Action`]s the room loop must
//! carry out — notifications, connection closes, timer arming, and the
//! match-record handoff. Keeping side effects out of the transition
//! function makes every rule in here testable without a socket or a clock.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use janken_core::errors::GameError;
use janken_core::game::{Move, Outcome};
use janken_core::ids::ConnectionId;
use janken_core::protocol::ServerEvent;
use janken_store::results::MatchRecord;

/// Maximum seats in the room.
pub const MAX_SEATS: usize = 2;

/// Stable display names by connection order.
const SEAT_NAMES: [&str; MAX_SEATS] = ["Player 1", "Player 2"];

/// Shown in place of a move that never arrived.
const NO_MOVE_TEXT: &str = "no move";

/// Broadcast after every resolution.
const RESET_MESSAGE: &str = "Round over. Send join to play again.";

/// Broadcast after a departure when no round has concluded yet.
const WAITING_MESSAGE: &str = "Waiting for another player to join.";

/// An event fed into the room mailbox.
#[derive(Clone, Debug)]
pub enum RoomEvent {
    /// A WebSocket connection opened.
    Connected(ConnectionId),
    /// The participant opted into the current round cycle.
    Join(ConnectionId),
    /// The participant submitted a move code.
    MoveSubmitted(ConnectionId, u8),
    /// The connection closed.
    Disconnected(ConnectionId),
    /// The round deadline timer fired.
    DeadlineFired,
}

/// A side effect the room loop must perform.
#[derive(Clone, Debug)]
pub enum Action {
    /// Send an event to one connection.
    Unicast(ConnectionId, ServerEvent),
    /// Send an event to every connection.
    Broadcast(ServerEvent),
    /// Terminate one connection.
    Close(ConnectionId),
    /// Arm the round deadline, replacing any live timer.
    ArmDeadline(Duration),
    /// Disarm the round deadline if armed.
    CancelDeadline,
    /// Hand a finished-match record to the result sink (fire-and-forget).
    Persist(MatchRecord),
}

/// One slot in the room.
#[derive(Clone, Debug)]
struct Seat {
    id: ConnectionId,
    joined: bool,
    mv: Option<Move>,
}

/// The single source of truth for one room.
pub struct Coordinator {
    /// Insertion order is connection order and defines seat 1 / seat 2.
    seats: Vec<Seat>,
    round_length: Duration,
    last_outcome: Option<String>,
}

impl Coordinator {
    /// Create an empty room with the given fixed round length.
    #[must_use]
    pub fn new(round_length: Duration) -> Self {
        Self {
            seats: Vec::with_capacity(MAX_SEATS),
            round_length,
            last_outcome: None,
        }
    }

    /// Connected participants.
    #[must_use]
    pub fn participant_count(&self) -> usize {
        self.seats.len()
    }

    /// Participants that have joined the current round cycle.
    #[must_use]
    pub fn joined_count(&self) -> usize {
        self.seats.iter().filter(|s| s.joined).count()
    }

    /// Process one event to completion.
    pub fn handle(&mut self, event: RoomEvent) -> Vec<Action> {
        match event {
            RoomEvent::Connected(id) => self.handle_connect(id),
            RoomEvent::Join(id) => self.handle_join(&id),
            RoomEvent::MoveSubmitted(id, code) => self.handle_move(&id, code),
            RoomEvent::Disconnected(id) => self.handle_disconnect(&id),
            RoomEvent::DeadlineFired => self.handle_deadline(),
        }
    }

    fn handle_connect(&mut self, id: ConnectionId) -> Vec<Action> {
        if self.seats.len() == MAX_SEATS {
            warn!(conn = %id, "connection rejected: room full");
            return vec![
                Action::Unicast(id.clone(), error_event(&GameError::CapacityExceeded)),
                Action::Close(id),
            ];
        }

        self.seats.push(Seat {
            id: id.clone(),
            joined: false,
            mv: None,
        });
        info!(conn = %id, participants = self.seats.len(), "participant connected");

        let mut actions = vec![
            Action::Unicast(
                id.clone(),
                ServerEvent::Connected {
                    connection_id: id.clone(),
                    participant_count: self.seats.len(),
                },
            ),
            self.roster_update(),
        ];
        // Late joiners get the previous outcome as context.
        if let Some(summary) = &self.last_outcome {
            actions.push(Action::Unicast(
                id,
                ServerEvent::RoundReset {
                    message: summary.clone(),
                },
            ));
        }
        actions
    }

    fn handle_join(&mut self, id: &ConnectionId) -> Vec<Action> {
        let Some(seat) = self.seats.iter_mut().find(|s| &s.id == id) else {
            warn!(conn = %id, "join from unknown connection");
            return vec![Action::Unicast(
                id.clone(),
                error_event(&GameError::UnknownParticipant),
            )];
        };
        if seat.joined {
            debug!(conn = %id, "duplicate join rejected");
            return vec![Action::Unicast(
                id.clone(),
                error_event(&GameError::DuplicateJoin),
            )];
        }
        seat.joined = true;

        let mut actions = vec![
            Action::Unicast(
                id.clone(),
                ServerEvent::Joined {
                    connection_id: id.clone(),
                    participant_count: self.seats.len(),
                },
            ),
            self.roster_update(),
        ];

        if self.joined_count() == MAX_SEATS {
            info!(round_secs = self.round_length.as_secs(), "round started");
            actions.push(Action::Broadcast(ServerEvent::RoundStarted {
                message: "Game started! Choose your move.".into(),
                started_at: Utc::now(),
                round_secs: self.round_length.as_secs(),
            }));
            actions.push(Action::ArmDeadline(self.round_length));
        }
        actions
    }

    fn handle_move(&mut self, id: &ConnectionId, code: u8) -> Vec<Action> {
        let Some(mv) = Move::from_code(code) else {
            debug!(conn = %id, code, "invalid move code");
            return vec![Action::Unicast(
                id.clone(),
                error_event(&GameError::InvalidMove),
            )];
        };
        let Some(seat) = self.seats.iter_mut().find(|s| &s.id == id && s.joined) else {
            debug!(conn = %id, "move before join");
            return vec![Action::Unicast(
                id.clone(),
                error_event(&GameError::NotJoined),
            )];
        };
        seat.mv = Some(mv);
        debug!(conn = %id, mv = mv.label(), "move accepted");

        let mut actions = vec![Action::Unicast(
            id.clone(),
            ServerEvent::MoveAccepted {
                move_text: mv.label().into(),
            },
        )];

        // A round only resolves here once both seats are joined with moves;
        // a lone early mover waits for the opponent.
        if self.joined_count() == MAX_SEATS && self.seats.iter().all(|s| s.mv.is_some()) {
            let seat1 = self.seats[0].mv;
            let seat2 = self.seats[1].mv;
            if let (Some(m1), Some(m2)) = (seat1, seat2) {
                actions.extend(self.resolve(Outcome::decide(m1, m2), Some(m1), Some(m2)));
            }
        }
        actions
    }

    fn handle_disconnect(&mut self, id: &ConnectionId) -> Vec<Action> {
        let Some(index) = self.seats.iter().position(|s| &s.id == id) else {
            // A rejected connection closing, or transport noise.
            debug!(conn = %id, "disconnect from unknown connection");
            return Vec::new();
        };
        let _ = self.seats.remove(index);
        info!(conn = %id, remaining = self.seats.len(), "participant left");

        // A departure always tears down the round: the survivor must
        // re-join before the next one.
        for seat in &mut self.seats {
            seat.joined = false;
            seat.mv = None;
        }

        let message = self
            .last_outcome
            .clone()
            .unwrap_or_else(|| WAITING_MESSAGE.into());
        vec![
            Action::CancelDeadline,
            Action::Broadcast(ServerEvent::PlayerLeft {
                participant_count: self.seats.len(),
                joined_count: 0,
                departed_id: id.clone(),
            }),
            Action::Broadcast(ServerEvent::RoundReset { message }),
        ]
    }

    fn handle_deadline(&mut self) -> Vec<Action> {
        // Re-validate: a disconnect may have invalidated the round, in
        // which case this fire is stale.
        if self.seats.len() != MAX_SEATS || self.joined_count() != MAX_SEATS {
            debug!("deadline fired outside a live round; ignoring");
            return Vec::new();
        }
        let seat1 = self.seats[0].mv;
        let seat2 = self.seats[1].mv;
        match Outcome::decide_on_timeout(seat1, seat2) {
            Some(outcome) => {
                info!(outcome = outcome.label(), "round timed out");
                self.resolve(outcome, seat1, seat2)
            }
            // Both moves present: the move-completion path already resolved.
            None => Vec::new(),
        }
    }

    /// Resolution steps shared by the move-completion and timeout paths.
    fn resolve(&mut self, outcome: Outcome, seat1: Option<Move>, seat2: Option<Move>) -> Vec<Action> {
        info!(outcome = outcome.label(), "round resolved");
        let mut actions = vec![
            Action::CancelDeadline,
            Action::Persist(MatchRecord::new(seat1, seat2, outcome)),
            Action::Broadcast(ServerEvent::Result {
                move1: seat1.map(Move::code),
                move2: seat2.map(Move::code),
                outcome: outcome.label().into(),
                move1_text: seat1.map_or_else(|| NO_MOVE_TEXT.into(), |m| m.label().into()),
                move2_text: seat2.map_or_else(|| NO_MOVE_TEXT.into(), |m| m.label().into()),
                seat1_name: SEAT_NAMES[0].into(),
                seat2_name: SEAT_NAMES[1].into(),
            }),
        ];

        for seat in &mut self.seats {
            seat.joined = false;
            seat.mv = None;
        }
        actions.push(Action::Broadcast(ServerEvent::RoundReset {
            message: RESET_MESSAGE.into(),
        }));
        self.last_outcome = Some(format!("Last round: {}", outcome.label()));

        // The observed contract re-arms a fresh deadline after every
        // resolution even though the next round needs two fresh joins; the
        // re-validation above turns the resulting stale fire into a no-op.
        actions.push(Action::ArmDeadline(self.round_length));
        actions
    }

    fn roster_update(&self) -> Action {
        Action::Broadcast(ServerEvent::RosterUpdate {
            participant_count: self.seats.len(),
            joined_count: self.joined_count(),
        })
    }
}

fn error_event(err: &GameError) -> ServerEvent {
    ServerEvent::Error {
        reason: err.to_string(),
    }
}
