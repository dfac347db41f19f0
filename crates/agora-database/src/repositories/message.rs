//! Message repository implementation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use agora_core::error::{AppError, ErrorKind};
use agora_core::result::AppResult;
use agora_core::types::UserId;
use agora_entity::message::ChatMessage;

/// Repository for chat message persistence.
#[derive(Debug, Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    /// Create a new message repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append a message row. The timestamp is the server-assigned receipt
    /// time, never a client-supplied value.
    pub async fn insert(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> AppResult<ChatMessage> {
        sqlx::query_as::<_, ChatMessage>(
            "INSERT INTO messages (sender_id, receiver_id, content, created_at) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(sender_id)
        .bind(receiver_id)
        .bind(content)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert message", e))
    }

    /// Mark every unread message from `sender_id` to `receiver_id` as read.
    ///
    /// Returns the number of rows transitioned; repeating the call is a
    /// no-op because already-read rows are excluded.
    pub async fn mark_conversation_read(
        &self,
        receiver_id: UserId,
        sender_id: UserId,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE messages SET read_at = NOW() \
             WHERE receiver_id = $1 AND sender_id = $2 AND read_at IS NULL",
        )
        .bind(receiver_id)
        .bind(sender_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to mark messages read", e)
        })?;
        Ok(result.rows_affected())
    }

    /// Users that share at least one message with `user_id`, in either
    /// direction. Used to scope presence broadcasts.
    pub async fn conversation_partner_ids(&self, user_id: UserId) -> AppResult<Vec<UserId>> {
        sqlx::query_scalar::<_, UserId>(
            "SELECT DISTINCT CASE WHEN sender_id = $1 THEN receiver_id ELSE sender_id END \
             FROM messages WHERE sender_id = $1 OR receiver_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list conversation partners", e)
        })
    }
}
