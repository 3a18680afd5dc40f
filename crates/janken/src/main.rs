//! # janken
//!
//! Rock-paper-scissors match server binary — wires the store, the room loop
//! and the HTTP/WebSocket server together.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use janken_room::{Coordinator, spawn_room};
use janken_server::config::ServerConfig;
use janken_server::registry::ConnectionRegistry;
use janken_server::server::GameServer;
use janken_server::shutdown::ShutdownCoordinator;
use janken_store::connection::{PoolConfig, new_file};
use janken_store::results::{MatchResultRepo, run_migrations};
use janken_store::sink::{NullResultSink, ResultSink, SqliteResultSink};

/// Rock-paper-scissors match server.
#[derive(Parser, Debug)]
#[command(name = "janken", about = "Two-player rock-paper-scissors match server")]
struct Cli {
    /// Host to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to bind (0 for auto-assign).
    #[arg(long, default_value = "8081")]
    port: u16,

    /// Path to the `SQLite` database for match results.
    /// Omit to disable persistence.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Round length in seconds.
    #[arg(long, default_value = "30")]
    round_secs: u64,
}

fn ensure_parent_dir(path: &std::path::Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

fn make_sink(db_path: Option<&std::path::Path>) -> Result<Arc<dyn ResultSink>> {
    let Some(path) = db_path else {
        tracing::info!("no --db-path given; match results will not be persisted");
        return Ok(Arc::new(NullResultSink));
    };
    ensure_parent_dir(path)?;
    let pool = new_file(&path.to_string_lossy(), &PoolConfig::default())
        .context("Failed to open database")?;
    let conn = pool.get().context("Failed to get DB connection")?;
    run_migrations(&conn).context("Failed to run migrations")?;
    tracing::info!(db = %path.display(), "match results persisted to SQLite");
    Ok(Arc::new(SqliteResultSink::new(MatchResultRepo::new(pool))))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let sink = make_sink(args.db_path.as_deref())?;

    let shutdown = ShutdownCoordinator::new();
    let registry = Arc::new(ConnectionRegistry::new());
    let coordinator = Coordinator::new(Duration::from_secs(args.round_secs));
    let (room, room_task) = spawn_room(coordinator, Arc::clone(&registry), sink, shutdown.token());

    let config = ServerConfig {
        host: args.host,
        port: args.port,
        ..ServerConfig::default()
    };
    let server = GameServer::new(config, registry, room);
    let (addr, serve_task) = server
        .listen(shutdown.token())
        .await
        .context("Failed to bind server")?;

    tracing::info!(
        round_secs = args.round_secs,
        "janken listening on http://{addr} (WebSocket endpoint at /ws)"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    shutdown
        .graceful_shutdown(vec![serve_task, room_task], None)
        .await;
    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn cli_default_host() {
        let cli = Cli::parse_from(["janken"]);
        assert_eq!(cli.host, "0.0.0.0");
    }

    #[test]
    fn cli_default_port() {
        let cli = Cli::parse_from(["janken"]);
        assert_eq!(cli.port, 8081);
    }

    #[test]
    fn cli_default_round_length() {
        let cli = Cli::parse_from(["janken"]);
        assert_eq!(cli.round_secs, 30);
    }

    #[test]
    fn cli_custom_port_and_round() {
        let cli = Cli::parse_from(["janken", "--port", "9000", "--round-secs", "5"]);
        assert_eq!(cli.port, 9000);
        assert_eq!(cli.round_secs, 5);
    }

    #[test]
    fn cli_db_path_defaults_to_none() {
        let cli = Cli::parse_from(["janken"]);
        assert_eq!(cli.db_path, None);
    }

    #[test]
    fn ensure_parent_dir_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("results.db");
        ensure_parent_dir(&path).unwrap();
        assert!(path.parent().unwrap().exists());
    }

    #[test]
    fn make_sink_without_path_is_null() {
        assert!(make_sink(None).is_ok());
    }

    #[test]
    fn make_sink_creates_db_on_first_run() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("results.db");
        assert!(!db_path.exists());
        make_sink(Some(&db_path)).unwrap();
        assert!(db_path.exists());
    }
}
