//! Message store adapter.
//!
//! The hub talks to persistence through the [`ChatStore`] trait so the
//! broker can be exercised without a database. [`SqlChatStore`] is the
//! production implementation over the PostgreSQL repositories.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use agora_core::result::AppResult;
use agora_core::types::UserId;
use agora_database::repositories::{MessageRepository, PresenceRepository};
use agora_entity::message::ChatMessage;

/// Thin persistence surface consumed by the hub and presence tracker.
#[async_trait]
pub trait ChatStore: Send + Sync + fmt::Debug {
    /// Append a chat message.
    async fn insert_message(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> AppResult<ChatMessage>;

    /// Mark all unread messages from `sender_id` to `receiver_id` as read.
    /// Returns the number of rows transitioned.
    async fn mark_conversation_read(
        &self,
        receiver_id: UserId,
        sender_id: UserId,
    ) -> AppResult<u64>;

    /// Write a user's durable presence state.
    async fn set_presence(
        &self,
        user_id: UserId,
        is_online: bool,
        last_seen: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Users sharing at least one message with `user_id`; the audience for
    /// that user's presence broadcasts.
    async fn conversation_partner_ids(&self, user_id: UserId) -> AppResult<Vec<UserId>>;
}

/// PostgreSQL-backed [`ChatStore`].
#[derive(Debug, Clone)]
pub struct SqlChatStore {
    messages: MessageRepository,
    presence: PresenceRepository,
}

impl SqlChatStore {
    /// Create a store over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            messages: MessageRepository::new(pool.clone()),
            presence: PresenceRepository::new(pool),
        }
    }
}

#[async_trait]
impl ChatStore for SqlChatStore {
    async fn insert_message(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> AppResult<ChatMessage> {
        self.messages
            .insert(sender_id, receiver_id, content, created_at)
            .await
    }

    async fn mark_conversation_read(
        &self,
        receiver_id: UserId,
        sender_id: UserId,
    ) -> AppResult<u64> {
        self.messages
            .mark_conversation_read(receiver_id, sender_id)
            .await
    }

    async fn set_presence(
        &self,
        user_id: UserId,
        is_online: bool,
        last_seen: DateTime<Utc>,
    ) -> AppResult<()> {
        self.presence.set_status(user_id, is_online, last_seen).await
    }

    async fn conversation_partner_ids(&self, user_id: UserId) -> AppResult<Vec<UserId>> {
        self.messages.conversation_partner_ids(user_id).await
    }
}
