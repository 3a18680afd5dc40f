//! `GameServer` — Axum HTTP + WebSocket server.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use janken_room::RoomHandle;

use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::registry::ConnectionRegistry;
use crate::ws;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Connection registry for event fan-out.
    pub registry: Arc<ConnectionRegistry>,
    /// Handle into the room mailbox.
    pub room: RoomHandle,
    /// When the server started.
    pub start_time: Instant,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

/// The game server.
pub struct GameServer {
    config: Arc<ServerConfig>,
    registry: Arc<ConnectionRegistry>,
    room: RoomHandle,
    start_time: Instant,
}

impl GameServer {
    /// Create a new server over an already-spawned room.
    #[must_use]
    pub fn new(config: ServerConfig, registry: Arc<ConnectionRegistry>, room: RoomHandle) -> Self {
        Self {
            config: Arc::new(config),
            registry,
            room,
            start_time: Instant::now(),
        }
    }

    /// Build the Axum router with all routes.
    #[must_use]
    pub fn router(&self) -> Router {
        let state = AppState {
            registry: Arc::clone(&self.registry),
            room: self.room.clone(),
            start_time: self.start_time,
            config: Arc::clone(&self.config),
        };

        Router::new()
            .route("/health", get(health_handler))
            .route("/ws", get(ws::ws_handler))
            .with_state(state)
    }

    /// Get the connection registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Get the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind and serve until `cancel` fires.
    ///
    /// Returns the bound address (useful with port `0`) and the serve task.
    pub async fn listen(
        &self,
        cancel: CancellationToken,
    ) -> io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener =
            tokio::net::TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        let addr = listener.local_addr()?;
        info!(%addr, "listening");

        let app = self.router();
        let task = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move { cancel.cancelled().await })
                .await;
            if let Err(err) = served {
                error!(error = %err, "server exited with error");
            }
        });
        Ok((addr, task))
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = state.registry.count();
    Json(health::health_check(state.start_time, connections))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use janken_room::{Coordinator, spawn_room};
    use janken_store::sink::NullResultSink;

    fn make_server() -> GameServer {
        let registry = Arc::new(ConnectionRegistry::new());
        let (room, _task) = spawn_room(
            Coordinator::new(Duration::from_secs(30)),
            Arc::clone(&registry),
            Arc::new(NullResultSink),
            CancellationToken::new(),
        );
        GameServer::new(ServerConfig::default(), registry, room)
    }

    #[tokio::test]
    async fn server_with_default_config() {
        let server = make_server();
        assert_eq!(server.config().host, "127.0.0.1");
        assert_eq!(server.config().port, 0);
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let server = make_server();
        let app = server.router();

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["connections"], 0);
        assert!(parsed["uptime_secs"].is_number());
    }

    #[tokio::test]
    async fn ws_route_requires_upgrade() {
        let server = make_server();
        let app = server.router();

        let req = Request::builder().uri("/ws").body(Body::empty()).unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert!(resp.status().is_client_error());
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let server = make_server();
        let app = server.router();

        let req = Request::builder()
            .uri("/nonexistent")
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn listen_binds_ephemeral_port() {
        let server = make_server();
        let cancel = CancellationToken::new();
        let (addr, task) = server.listen(cancel.clone()).await.unwrap();
        assert_ne!(addr.port(), 0);
        cancel.cancel();
        task.await.unwrap();
    }
}
