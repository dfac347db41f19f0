//! Health probe handlers.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /api/health — liveness probe.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /api/health/detailed — includes a database round-trip.
pub async fn health_detailed(State(state): State<AppState>) -> Json<Value> {
    let database_ok = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.db_pool)
        .await
        .is_ok();

    let status = if database_ok { "ok" } else { "degraded" };
    Json(json!({
        "status": status,
        "database": database_ok,
    }))
}
