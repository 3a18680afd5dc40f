//! Cancellable round deadline.
//!
//! At most one deadline is live at a time. Arming replaces the previous
//! timer; firing sends [`RoomEvent::DeadlineFired`] back through the room
//! mailbox so the fire is serialized against every other event.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::coordinator::RoomEvent;

struct ArmedDeadline {
    token: CancellationToken,
    task: JoinHandle<()>,
}

/// Owns the (at most one) live deadline task for a room.
#[derive(Default)]
pub struct DeadlineTimer {
    current: Option<ArmedDeadline>,
}

impl DeadlineTimer {
    /// Create a disarmed timer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a deadline `after` from now, replacing any live one.
    ///
    /// On expiry the task sends [`RoomEvent::DeadlineFired`] into `events`.
    /// A send failure means the room loop is gone, so it is ignored.
    pub fn arm(&mut self, after: Duration, events: mpsc::Sender<RoomEvent>) {
        self.cancel();
        let token = CancellationToken::new();
        let task_token = token.clone();
        let task = tokio::spawn(async move {
            tokio::select! {
                () = task_token.cancelled() => {
                    trace!("deadline cancelled before expiry");
                }
                () = tokio::time::sleep(after) => {
                    debug!(secs = after.as_secs(), "deadline expired");
                    let _ = events.send(RoomEvent::DeadlineFired).await;
                }
            }
        });
        self.current = Some(ArmedDeadline { token, task });
    }

    /// Cancel the live deadline, if any.
    pub fn cancel(&mut self) {
        if let Some(armed) = self.current.take() {
            armed.token.cancel();
            armed.task.abort();
        }
    }

    /// Whether a deadline is currently armed.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.current.is_some()
    }
}

impl Drop for DeadlineTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[tokio::test(start_paused = true)]
    async fn fires_after_duration() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timer = DeadlineTimer::new();
        timer.arm(Duration::from_millis(20), tx);

        let event = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("deadline should fire")
            .expect("channel open");
        assert!(matches!(event, RoomEvent::DeadlineFired));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_suppresses_fire() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timer = DeadlineTimer::new();
        timer.arm(Duration::from_millis(20), tx);
        timer.cancel();
        assert!(!timer.is_armed());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_replaces_previous_deadline() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timer = DeadlineTimer::new();
        timer.arm(Duration::from_millis(20), tx.clone());
        timer.arm(Duration::from_millis(80), tx);

        // Only the second deadline may fire, so nothing arrives at 20ms.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());

        let event = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("replacement deadline should fire")
            .expect("channel open");
        assert!(matches!(event, RoomEvent::DeadlineFired));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels_outstanding_deadline() {
        let (tx, mut rx) = mpsc::channel(4);
        {
            let mut timer = DeadlineTimer::new();
            timer.arm(Duration::from_millis(20), tx);
        }
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(rx.try_recv().is_err());
    }
}
