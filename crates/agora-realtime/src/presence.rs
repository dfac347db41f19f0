//! Presence tracker — turns connection-count transitions into durable
//! state and notification frames.
//!
//! `last_seen` is written only on explicit online/offline transitions;
//! heartbeats refresh the in-memory liveness stamp, not the store.

use std::sync::Arc;

use chrono::Utc;

use agora_core::result::AppResult;
use agora_core::types::UserId;

use crate::protocol::ServerFrame;
use crate::store::ChatStore;

/// Translates hub-observed transitions into store writes and frames.
///
/// The store write always completes before the returned frame exists, so
/// callers cannot broadcast a transition that was never persisted.
#[derive(Debug, Clone)]
pub struct PresenceTracker {
    store: Arc<dyn ChatStore>,
}

impl PresenceTracker {
    /// Create a tracker over the given store.
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self { store }
    }

    /// Record that a user gained their first live connection.
    pub async fn went_online(&self, user_id: UserId) -> AppResult<ServerFrame> {
        let now = Utc::now();
        self.store.set_presence(user_id, true, now).await?;
        Ok(ServerFrame::StatusUpdate {
            user_id,
            is_online: true,
            last_seen: now,
        })
    }

    /// Record that a user lost their last live connection.
    pub async fn went_offline(&self, user_id: UserId) -> AppResult<ServerFrame> {
        let now = Utc::now();
        self.store.set_presence(user_id, false, now).await?;
        Ok(ServerFrame::StatusUpdate {
            user_id,
            is_online: false,
            last_seen: now,
        })
    }
}
