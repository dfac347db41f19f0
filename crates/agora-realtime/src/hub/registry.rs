//! Connection registry — owned exclusively by the hub event loop.
//!
//! Because every mutation happens on the hub task, plain maps suffice; no
//! lock guards the registry itself.

use std::collections::HashMap;
use std::sync::Arc;

use agora_core::types::UserId;

use crate::connection::handle::{ConnectionHandle, ConnectionId};

/// All live connections, indexed by connection ID and by user.
#[derive(Debug, Default)]
pub struct Registry {
    connections: HashMap<ConnectionId, Arc<ConnectionHandle>>,
    by_user: HashMap<UserId, Vec<ConnectionId>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection. Returns the user's live-connection count after
    /// the insert (1 means this was their first).
    pub fn insert(&mut self, handle: Arc<ConnectionHandle>) -> usize {
        let user_id = handle.user_id;
        let conn_id = handle.id;
        self.connections.insert(conn_id, handle);
        let ids = self.by_user.entry(user_id).or_default();
        ids.push(conn_id);
        ids.len()
    }

    /// Remove a connection, maintaining the user index. Removing an
    /// unknown ID is a no-op.
    pub fn remove(&mut self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        let handle = self.connections.remove(conn_id)?;
        if let Some(ids) = self.by_user.get_mut(&handle.user_id) {
            ids.retain(|id| id != conn_id);
            if ids.is_empty() {
                self.by_user.remove(&handle.user_id);
            }
        }
        Some(handle)
    }

    /// Look up a connection by ID.
    pub fn get(&self, conn_id: &ConnectionId) -> Option<&Arc<ConnectionHandle>> {
        self.connections.get(conn_id)
    }

    /// All connections for a user.
    pub fn user_connections(&self, user_id: UserId) -> Vec<Arc<ConnectionHandle>> {
        self.by_user
            .get(&user_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.connections.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of live connections for a user.
    pub fn user_live_count(&self, user_id: UserId) -> usize {
        self.by_user.get(&user_id).map_or(0, Vec::len)
    }

    /// Iterate over all live connections.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ConnectionHandle>> {
        self.connections.values()
    }

    /// Total number of live connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(user: i64) -> Arc<ConnectionHandle> {
        let (handle, _rx) = ConnectionHandle::channel(UserId::new(user), 4);
        Arc::new(handle)
    }

    #[test]
    fn test_size_tracks_live_connections() {
        let mut registry = Registry::new();
        let a1 = handle(1);
        let a2 = handle(1);
        let b1 = handle(2);

        assert_eq!(registry.insert(a1.clone()), 1);
        assert_eq!(registry.insert(a2.clone()), 2);
        assert_eq!(registry.insert(b1.clone()), 1);
        assert_eq!(registry.len(), 3);

        assert!(registry.remove(&a1.id).is_some());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.user_live_count(UserId::new(1)), 1);

        assert!(registry.remove(&a2.id).is_some());
        assert_eq!(registry.user_live_count(UserId::new(1)), 0);
        assert!(registry.remove(&b1.id).is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut registry = Registry::new();
        let a = handle(1);
        registry.insert(a.clone());
        assert!(registry.remove(&a.id).is_some());
        assert!(registry.remove(&a.id).is_none());
        assert_eq!(registry.len(), 0);
        assert_eq!(registry.user_live_count(UserId::new(1)), 0);
    }

    #[test]
    fn test_user_connections_snapshot() {
        let mut registry = Registry::new();
        let a1 = handle(1);
        let a2 = handle(1);
        registry.insert(a1.clone());
        registry.insert(a2.clone());

        let conns = registry.user_connections(UserId::new(1));
        assert_eq!(conns.len(), 2);
        assert!(registry.user_connections(UserId::new(9)).is_empty());
    }
}
