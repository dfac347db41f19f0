//! Application state shared across all handlers.

use std::sync::Arc;

use sqlx::PgPool;

use agora_core::config::AppConfig;
use agora_database::repositories::PresenceRepository;
use agora_realtime::connection::authenticator::SocketAuthenticator;
use agora_realtime::hub::HubHandle;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`. All fields are
/// cheap to clone across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// PostgreSQL connection pool.
    pub db_pool: PgPool,
    /// Front door to the hub event loop.
    pub hub: HubHandle,
    /// Session-token authenticator for socket upgrades.
    pub authenticator: SocketAuthenticator,
    /// Presence repository for HTTP-side reads.
    pub presence_repo: Arc<PresenceRepository>,
}
