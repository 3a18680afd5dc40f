//! The room event loop.
//!
//! One task owns the [`Coordinator`] and pulls events from an mpsc mailbox,
//! applying the resulting actions in order before touching the next event.
//! The transport boundary is the [`Transport`] trait; the server crate
//! implements it over the live WebSocket connections, and tests implement it
//! with recording stubs.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use janken_core::ids::ConnectionId;
use janken_core::protocol::ServerEvent;
use janken_store::sink::ResultSink;

use crate::coordinator::{Action, Coordinator, RoomEvent};
use crate::deadline::DeadlineTimer;

/// Mailbox depth. Events are tiny and producers await on send, so this only
/// bounds burst absorption.
const MAILBOX_CAPACITY: usize = 64;

/// Delivery surface the room loop pushes through.
///
/// Implementations must not block: a slow or gone peer is the
/// implementation's problem, never the room loop's.
pub trait Transport: Send + Sync + 'static {
    /// Deliver an event to one connection.
    fn unicast(&self, target: &ConnectionId, event: &ServerEvent);
    /// Deliver an event to every connection.
    fn broadcast(&self, event: &ServerEvent);
    /// Terminate one connection.
    fn close(&self, target: &ConnectionId);
}

/// Cloneable handle for feeding events into a room.
#[derive(Clone)]
pub struct RoomHandle {
    events: mpsc::Sender<RoomEvent>,
}

impl RoomHandle {
    /// Enqueue an event. Returns `false` if the room loop has shut down.
    pub async fn send(&self, event: RoomEvent) -> bool {
        self.events.send(event).await.is_ok()
    }
}

/// Spawn the room loop.
///
/// Returns the handle producers use and the loop's join handle. The loop
/// exits when `cancel` fires or every [`RoomHandle`] is dropped.
pub fn spawn_room<T, S>(
    coordinator: Coordinator,
    transport: Arc<T>,
    sink: Arc<S>,
    cancel: CancellationToken,
) -> (RoomHandle, JoinHandle<()>)
where
    T: Transport,
    S: ResultSink + ?Sized,
{
    let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
    let handle = RoomHandle { events: tx };
    let task = tokio::spawn(run_room(coordinator, transport, sink, rx, cancel));
    (handle, task)
}

async fn run_room<T, S>(
    mut coordinator: Coordinator,
    transport: Arc<T>,
    sink: Arc<S>,
    mut events_rx: mpsc::Receiver<RoomEvent>,
    cancel: CancellationToken,
) where
    T: Transport,
    S: ResultSink + ?Sized,
{
    // The timer gets its own channel so the loop holds no sender to its own
    // mailbox, letting handle drops close it.
    let (timer_tx, mut timer_rx) = mpsc::channel(4);
    let mut timer = DeadlineTimer::new();
    info!("room loop started");

    loop {
        let event = tokio::select! {
            () = cancel.cancelled() => {
                info!("room loop stopping: shutdown requested");
                break;
            }
            maybe = events_rx.recv() => match maybe {
                Some(event) => event,
                None => {
                    debug!("room loop stopping: all handles dropped");
                    break;
                }
            },
            Some(event) = timer_rx.recv() => event,
        };

        for action in coordinator.handle(event) {
            apply(action, &transport, &sink, &mut timer, &timer_tx);
        }
    }
    timer.cancel();
}

fn apply<T, S>(
    action: Action,
    transport: &Arc<T>,
    sink: &Arc<S>,
    timer: &mut DeadlineTimer,
    timer_tx: &mpsc::Sender<RoomEvent>,
) where
    T: Transport,
    S: ResultSink + ?Sized,
{
    match action {
        Action::Unicast(target, event) => transport.unicast(&target, &event),
        Action::Broadcast(event) => transport.broadcast(&event),
        Action::Close(target) => transport.close(&target),
        Action::ArmDeadline(after) => timer.arm(after, timer_tx.clone()),
        Action::CancelDeadline => timer.cancel(),
        Action::Persist(record) => {
            // Fire-and-forget: the round outcome was already broadcast and a
            // storage failure must not disturb the session.
            let sink = Arc::clone(sink);
            let _handle = tokio::spawn(async move {
                if let Err(error) = sink.record(record).await {
                    warn!(%error, "failed to persist match record");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tokio::time::timeout;

    use janken_store::errors::Result as StoreResult;
    use janken_store::results::MatchRecord;

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum Delivery {
        Unicast(ConnectionId, String),
        Broadcast(String),
        Close(ConnectionId),
    }

    #[derive(Default)]
    struct RecordingTransport {
        deliveries: Mutex<Vec<Delivery>>,
    }

    impl RecordingTransport {
        fn kinds(&self) -> Vec<Delivery> {
            self.deliveries.lock().clone()
        }

        fn broadcast_kinds(&self) -> Vec<String> {
            self.deliveries
                .lock()
                .iter()
                .filter_map(|d| match d {
                    Delivery::Broadcast(kind) => Some(kind.clone()),
                    _ => None,
                })
                .collect()
        }
    }

    impl Transport for RecordingTransport {
        fn unicast(&self, target: &ConnectionId, event: &ServerEvent) {
            self.deliveries
                .lock()
                .push(Delivery::Unicast(target.clone(), event.kind().to_owned()));
        }

        fn broadcast(&self, event: &ServerEvent) {
            self.deliveries
                .lock()
                .push(Delivery::Broadcast(event.kind().to_owned()));
        }

        fn close(&self, target: &ConnectionId) {
            self.deliveries.lock().push(Delivery::Close(target.clone()));
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        records: Mutex<Vec<MatchRecord>>,
    }

    #[async_trait]
    impl ResultSink for RecordingSink {
        async fn record(&self, record: MatchRecord) -> StoreResult<()> {
            self.records.lock().push(record);
            Ok(())
        }
    }

    struct Harness {
        handle: RoomHandle,
        transport: Arc<RecordingTransport>,
        sink: Arc<RecordingSink>,
        cancel: CancellationToken,
        task: JoinHandle<()>,
    }

    fn boot(round_length: Duration) -> Harness {
        let transport = Arc::new(RecordingTransport::default());
        let sink = Arc::new(RecordingSink::default());
        let cancel = CancellationToken::new();
        let (handle, task) = spawn_room(
            Coordinator::new(round_length),
            Arc::clone(&transport),
            Arc::clone(&sink),
            cancel.clone(),
        );
        Harness {
            handle,
            transport,
            sink,
            cancel,
            task,
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    #[tokio::test]
    async fn full_round_over_the_mailbox() {
        let h = boot(Duration::from_secs(30));
        let (a, b) = (ConnectionId::from("a"), ConnectionId::from("b"));

        assert!(h.handle.send(RoomEvent::Connected(a.clone())).await);
        assert!(h.handle.send(RoomEvent::Connected(b.clone())).await);
        assert!(h.handle.send(RoomEvent::Join(a.clone())).await);
        assert!(h.handle.send(RoomEvent::Join(b.clone())).await);
        assert!(h.handle.send(RoomEvent::MoveSubmitted(a, 1)).await);
        assert!(h.handle.send(RoomEvent::MoveSubmitted(b, 3)).await);
        settle().await;

        let kinds = h.transport.broadcast_kinds();
        assert!(kinds.contains(&"roundStarted".to_owned()));
        assert!(kinds.contains(&"result".to_owned()));
        assert!(kinds.contains(&"roundReset".to_owned()));

        let records = h.sink.records.lock().clone();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].outcome, "Player 1 wins");

        h.cancel.cancel();
        timeout(Duration::from_secs(1), h.task)
            .await
            .expect("loop exits on cancel")
            .expect("loop task completes");
    }

    #[tokio::test]
    async fn third_connection_closed_not_broadcast() {
        let h = boot(Duration::from_secs(30));
        let (a, b, c) = (
            ConnectionId::from("a"),
            ConnectionId::from("b"),
            ConnectionId::from("c"),
        );
        let _ = h.handle.send(RoomEvent::Connected(a)).await;
        let _ = h.handle.send(RoomEvent::Connected(b)).await;
        let _ = h.handle.send(RoomEvent::Connected(c.clone())).await;
        settle().await;

        let kinds = h.transport.kinds();
        assert!(kinds.contains(&Delivery::Close(c.clone())));
        // The rejection error goes only to the rejected connection.
        assert!(kinds.contains(&Delivery::Unicast(c, "error".to_owned())));
        assert_eq!(h.transport.broadcast_kinds().len(), 2); // two roster updates

        h.cancel.cancel();
    }

    #[tokio::test]
    async fn deadline_fire_resolves_through_the_mailbox() {
        let h = boot(Duration::from_millis(40));
        let (a, b) = (ConnectionId::from("a"), ConnectionId::from("b"));
        let _ = h.handle.send(RoomEvent::Connected(a.clone())).await;
        let _ = h.handle.send(RoomEvent::Connected(b.clone())).await;
        let _ = h.handle.send(RoomEvent::Join(a.clone())).await;
        let _ = h.handle.send(RoomEvent::Join(b)).await;
        let _ = h.handle.send(RoomEvent::MoveSubmitted(a, 2)).await;

        tokio::time::sleep(Duration::from_millis(120)).await;

        let records = h.sink.records.lock().clone();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].outcome, "Player 1 wins by default");
        assert!(h.transport.broadcast_kinds().contains(&"result".to_owned()));

        h.cancel.cancel();
    }

    #[tokio::test]
    async fn disconnect_cancels_deadline() {
        let h = boot(Duration::from_millis(40));
        let (a, b) = (ConnectionId::from("a"), ConnectionId::from("b"));
        let _ = h.handle.send(RoomEvent::Connected(a.clone())).await;
        let _ = h.handle.send(RoomEvent::Connected(b.clone())).await;
        let _ = h.handle.send(RoomEvent::Join(a.clone())).await;
        let _ = h.handle.send(RoomEvent::Join(b)).await;
        let _ = h.handle.send(RoomEvent::Disconnected(a)).await;

        tokio::time::sleep(Duration::from_millis(120)).await;

        // No timeout resolution after the round was abandoned.
        assert!(h.sink.records.lock().is_empty());
        assert!(!h.transport.broadcast_kinds().contains(&"result".to_owned()));

        h.cancel.cancel();
    }

    #[tokio::test]
    async fn loop_exits_when_handles_dropped() {
        let h = boot(Duration::from_secs(30));
        drop(h.handle);
        timeout(Duration::from_secs(1), h.task)
            .await
            .expect("loop exits when mailbox closes")
            .expect("loop task completes");
    }
}
