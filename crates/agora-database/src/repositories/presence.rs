//! Presence repository implementation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use agora_core::error::{AppError, ErrorKind};
use agora_core::result::AppResult;
use agora_core::types::UserId;
use agora_entity::presence::PresenceRecord;

/// Repository for the `user_status` table.
#[derive(Debug, Clone)]
pub struct PresenceRepository {
    pool: PgPool,
}

impl PresenceRepository {
    /// Create a new presence repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Write a user's online flag and last-seen timestamp.
    ///
    /// Attempts an UPDATE of the existing row first; if zero rows were
    /// affected, INSERTs a fresh one. Net effect is an idempotent upsert
    /// without relying on `ON CONFLICT`.
    pub async fn set_status(
        &self,
        user_id: UserId,
        is_online: bool,
        last_seen: DateTime<Utc>,
    ) -> AppResult<()> {
        let updated = sqlx::query(
            "UPDATE user_status SET is_online = $2, last_seen = $3 WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(is_online)
        .bind(last_seen)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update presence", e))?;

        if updated.rows_affected() == 0 {
            sqlx::query(
                "INSERT INTO user_status (user_id, is_online, last_seen) VALUES ($1, $2, $3)",
            )
            .bind(user_id)
            .bind(is_online)
            .bind(last_seen)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to insert presence", e)
            })?;
        }

        Ok(())
    }

    /// Read a user's stored presence row.
    pub async fn find(&self, user_id: UserId) -> AppResult<Option<PresenceRecord>> {
        sqlx::query_as::<_, PresenceRecord>("SELECT * FROM user_status WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to read presence", e))
    }
}
