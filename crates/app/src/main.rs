//! famly - watch-party room server
//!
//! Serves one shared room: a TCP event channel for live participants and an
//! HTTP query interface for snapshots, advancing and video search.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use famly_core::{Database, DisabledLookup, RoomCoordinator, VideoLookup};
use famly_net::{PeerTable, Server};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
mod http;
mod lookup;

use config::FamlyConfig;
use lookup::YoutubeLookup;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Starting famly");

    let config = FamlyConfig::load()?;
    let db_path = config.database_path()?;
    let db = Database::open(&db_path)
        .with_context(|| format!("opening database at {}", db_path.display()))?;
    info!(path = %db_path.display(), version = db.schema_version(), "Database ready");

    // The peer table is the room's transport and the server's connection set
    let peers = PeerTable::new();
    let room = RoomCoordinator::spawn(db, peers.clone());

    let room_addr = SocketAddr::new(config.bind_address, config.room_port);
    let room_server = Server::start(room_addr, room.clone(), peers)
        .await
        .context("starting room server")?;

    let lookup: Arc<dyn VideoLookup> = match &config.youtube_api_key {
        Some(key) => Arc::new(YoutubeLookup::new(key.clone(), config.search_results)),
        None => {
            warn!("YOUTUBE_API_KEY not set, search disabled");
            Arc::new(DisabledLookup)
        }
    };

    let app = http::router(http::AppState { room, lookup });
    let http_addr = SocketAddr::new(config.bind_address, config.http_port);
    let listener = tokio::net::TcpListener::bind(http_addr)
        .await
        .with_context(|| format!("binding {}", http_addr))?;
    info!(addr = %http_addr, "HTTP interface listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    room_server.shutdown().await;
    info!("famly stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
