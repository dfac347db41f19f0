//! Session repository — read-only view of collaborator-issued sessions.

use sqlx::PgPool;

use agora_core::error::{AppError, ErrorKind};
use agora_core::result::AppResult;
use agora_entity::session::Session;

/// Repository for resolving session tokens at the upgrade boundary.
///
/// Sessions are issued and expired by the surrounding auth layer; this
/// repository only reads them.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    /// Create a new session repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Look up a non-expired session by token.
    pub async fn find_valid(&self, token: &str) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>(
            "SELECT token, user_id, expires_at FROM sessions \
             WHERE token = $1 AND expires_at > NOW()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to resolve session", e))
    }
}
