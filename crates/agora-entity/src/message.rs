//! Chat message entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use agora_core::types::{MessageId, UserId};

/// A persisted direct chat message between two users.
///
/// Immutable once written, except for the unread→read transition on
/// `read_at`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatMessage {
    /// Unique message identifier.
    pub id: MessageId,
    /// User who sent the message.
    pub sender_id: UserId,
    /// User the message was addressed to.
    pub receiver_id: UserId,
    /// Message body.
    pub content: String,
    /// Server-assigned creation time.
    pub created_at: DateTime<Utc>,
    /// When the receiver marked the message read, if ever.
    pub read_at: Option<DateTime<Utc>>,
}

impl ChatMessage {
    /// Whether the receiver has read this message.
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}
