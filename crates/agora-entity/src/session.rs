//! Session row read by the socket upgrade boundary.
//!
//! Sessions are issued by the surrounding auth layer; this crate only
//! models the row shape the gateway reads to resolve a token to a user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use agora_core::types::UserId;

/// An authenticated session token row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    /// Opaque session token.
    pub token: String,
    /// User the token authenticates.
    pub user_id: UserId,
    /// Token expiry.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session has expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}
