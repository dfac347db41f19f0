//! WebSocket upgrade handler.

use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use tracing::info;

use agora_realtime::connection::pump::serve_socket;

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for WebSocket authentication.
#[derive(Debug, serde::Deserialize)]
pub struct WsQuery {
    /// Collaborator-issued session token.
    pub token: String,
}

/// GET /ws?token={session} — WebSocket upgrade.
///
/// Identity is resolved before the upgrade; an unauthenticated request is
/// refused before any hub state changes.
pub async fn ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
) -> Result<Response, ApiError> {
    let identity = state.authenticator.authenticate(&query.token).await?;

    info!(user_id = %identity.user_id, "WebSocket upgrade authorized");

    let hub = state.hub.clone();
    let config = state.config.realtime.clone();

    Ok(ws
        .max_message_size(config.max_frame_bytes)
        .on_upgrade(move |socket| serve_socket(socket, identity, hub, config)))
}
