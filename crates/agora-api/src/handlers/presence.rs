//! HTTP-side presence read.
//!
//! Reads go to the store, never the live registry; the registry belongs
//! to the hub task alone.

use axum::extract::{Path, State};
use axum::Json;

use agora_core::error::AppError;
use agora_core::types::UserId;
use agora_entity::presence::PresenceRecord;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/users/{id}/status — stored presence for a user.
pub async fn user_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PresenceRecord>, ApiError> {
    let record = state
        .presence_repo
        .find(UserId::new(id))
        .await?
        .ok_or_else(|| AppError::not_found(format!("No presence recorded for user {id}")))?;

    Ok(Json(record))
}
