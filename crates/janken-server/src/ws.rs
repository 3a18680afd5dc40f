//! WebSocket upgrade and per-connection tasks.
//!
//! Each accepted socket gets a fresh [`ConnectionId`] and two tasks: the
//! read loop (this function's body) parses frames into [`RoomEvent`]s, and
//! a write task drains the connection's frame queue. The room closes a
//! connection by firing its token; the write task then flushes whatever is
//! already queued (the rejection reason, typically) before sending Close.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use janken_core::ids::ConnectionId;
use janken_core::protocol::{ClientCommand, ServerEvent};
use janken_room::{RoomEvent, Transport};

use crate::server::AppState;

/// Unicast to the sender of a frame the server cannot parse.
const UNPARSEABLE_REASON: &str = "Unrecognized command.";

/// GET /ws — upgrade to WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let max = state.config.max_message_size;
    ws.max_message_size(max)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let id = ConnectionId::new();
    info!(conn = %id, "websocket connected");

    let (ws_tx, mut ws_rx) = socket.split();
    let (frames_tx, frames_rx) = mpsc::channel::<String>(state.config.frame_queue_depth);
    let closer = CancellationToken::new();

    state
        .registry
        .register(id.clone(), frames_tx, closer.clone());
    let writer = tokio::spawn(write_frames(ws_tx, frames_rx, closer.clone()));

    if !state.room.send(RoomEvent::Connected(id.clone())).await {
        warn!(conn = %id, "room is gone; dropping connection");
        state.registry.deregister(&id);
        closer.cancel();
        let _ = writer.await;
        return;
    }

    while let Some(Ok(message)) = ws_rx.next().await {
        match message {
            Message::Text(text) => {
                let event = match serde_json::from_str::<ClientCommand>(text.as_str()) {
                    Ok(ClientCommand::Join) => RoomEvent::Join(id.clone()),
                    Ok(ClientCommand::MakeMove { mv }) => {
                        RoomEvent::MoveSubmitted(id.clone(), mv)
                    }
                    Err(error) => {
                        debug!(conn = %id, %error, "unparseable frame");
                        state.registry.unicast(
                            &id,
                            &ServerEvent::Error {
                                reason: UNPARSEABLE_REASON.into(),
                            },
                        );
                        continue;
                    }
                };
                if !state.room.send(event).await {
                    break;
                }
            }
            Message::Close(_) => break,
            // Axum answers pings itself; binary frames carry nothing we speak.
            Message::Binary(_) | Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    info!(conn = %id, "websocket disconnected");
    let _ = state.room.send(RoomEvent::Disconnected(id.clone())).await;
    state.registry.deregister(&id);
    closer.cancel();
    let _ = writer.await;
}

/// Forward queued frames to the socket until the queue closes or the close
/// token fires; on close, drain what is already queued first.
async fn write_frames(
    mut ws_tx: futures::stream::SplitSink<WebSocket, Message>,
    mut frames_rx: mpsc::Receiver<String>,
    closer: CancellationToken,
) {
    loop {
        tokio::select! {
            maybe = frames_rx.recv() => match maybe {
                Some(frame) => {
                    if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                        return;
                    }
                }
                None => break,
            },
            () = closer.cancelled() => {
                while let Ok(frame) = frames_rx.try_recv() {
                    if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                        return;
                    }
                }
                break;
            }
        }
    }
    let _ = ws_tx.send(Message::Close(None)).await;
}
