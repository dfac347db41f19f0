//! Agora Server — real-time forum messaging backend.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use agora_api::state::AppState;
use agora_core::config::AppConfig;
use agora_core::error::AppError;
use agora_database::repositories::{PresenceRepository, SessionRepository};
use agora_database::{migration, DatabasePool};
use agora_realtime::connection::authenticator::SocketAuthenticator;
use agora_realtime::hub::Hub;
use agora_realtime::store::SqlChatStore;

#[tokio::main]
async fn main() {
    let env = std::env::var("AGORA_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main server run function.
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Agora v{}", env!("CARGO_PKG_VERSION"));

    // ── Database ─────────────────────────────────────────────────
    let pool = DatabasePool::connect(&config.database).await?.into_pool();
    migration::run_migrations(&pool).await?;

    // ── Messaging hub ────────────────────────────────────────────
    let store = Arc::new(SqlChatStore::new(pool.clone()));
    let (hub, hub_handle) = Hub::new(store, config.realtime.clone());
    tokio::spawn(hub.run());

    // ── Gateway state ────────────────────────────────────────────
    let authenticator = SocketAuthenticator::new(Arc::new(SessionRepository::new(pool.clone())));
    let presence_repo = Arc::new(PresenceRepository::new(pool.clone()));

    let state = AppState {
        config: Arc::new(config.clone()),
        db_pool: pool,
        hub: hub_handle,
        authenticator,
        presence_repo,
    };

    // ── HTTP server ──────────────────────────────────────────────
    let app = agora_api::build_router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("Agora server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    tracing::info!("Agora server stopped gracefully");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
}
