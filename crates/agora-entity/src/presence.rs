//! Presence row entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use agora_core::types::UserId;

/// The durable presence state for a user.
///
/// Derived state: a user is online iff at least one live connection is
/// registered for them in the hub. This row is the store-side projection
/// of that fact, read by the HTTP side instead of the live registry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PresenceRecord {
    /// User this row belongs to.
    pub user_id: UserId,
    /// Whether the user currently holds at least one live connection.
    pub is_online: bool,
    /// Last time the user transitioned offline (or came online for the
    /// first time).
    pub last_seen: DateTime<Utc>,
}
