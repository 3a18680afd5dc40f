//! Event fan-out to connected WebSocket clients.
//!
//! [`ConnectionRegistry`] is the server's implementation of the room's
//! [`Transport`] boundary. Each registered connection gets a bounded frame
//! queue feeding its write task and a cancellation token the registry fires
//! to close it.

use std::collections::HashMap;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use janken_core::ids::ConnectionId;
use janken_core::protocol::ServerEvent;
use janken_room::Transport;

struct Peer {
    frames: mpsc::Sender<String>,
    closer: CancellationToken,
}

/// Connected clients indexed by connection id.
#[derive(Default)]
pub struct ConnectionRegistry {
    peers: RwLock<HashMap<ConnectionId, Peer>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection's frame queue and close token.
    pub fn register(
        &self,
        id: ConnectionId,
        frames: mpsc::Sender<String>,
        closer: CancellationToken,
    ) {
        let _ = self
            .peers
            .write()
            .insert(id, Peer { frames, closer });
    }

    /// Remove a connection. Safe to call for ids never registered.
    pub fn deregister(&self, id: &ConnectionId) {
        let _ = self.peers.write().remove(id);
    }

    /// Number of registered connections.
    #[must_use]
    pub fn count(&self) -> usize {
        self.peers.read().len()
    }

    /// Queue a frame on one connection, dropping it if the queue is full or
    /// the peer is gone. The room loop must never block on a slow client.
    fn send_to(&self, id: &ConnectionId, frame: String) {
        let peers = self.peers.read();
        let Some(peer) = peers.get(id) else {
            debug!(conn = %id, "dropping frame for unknown connection");
            return;
        };
        if peer.frames.try_send(frame).is_err() {
            warn!(conn = %id, "dropping frame: queue full or writer gone");
        }
    }

    fn encode(event: &ServerEvent) -> Option<String> {
        match serde_json::to_string(event) {
            Ok(json) => Some(json),
            Err(error) => {
                warn!(kind = event.kind(), %error, "failed to serialize event");
                None
            }
        }
    }
}

impl Transport for ConnectionRegistry {
    fn unicast(&self, target: &ConnectionId, event: &ServerEvent) {
        let Some(json) = Self::encode(event) else {
            return;
        };
        debug!(conn = %target, kind = event.kind(), "unicast");
        self.send_to(target, json);
    }

    fn broadcast(&self, event: &ServerEvent) {
        let Some(json) = Self::encode(event) else {
            return;
        };
        let peers = self.peers.read();
        debug!(kind = event.kind(), recipients = peers.len(), "broadcast");
        for (id, peer) in peers.iter() {
            if peer.frames.try_send(json.clone()).is_err() {
                warn!(conn = %id, "dropping broadcast frame: queue full or writer gone");
            }
        }
    }

    fn close(&self, target: &ConnectionId) {
        let peers = self.peers.read();
        if let Some(peer) = peers.get(target) {
            debug!(conn = %target, "closing connection");
            peer.closer.cancel();
        }
    }
}
