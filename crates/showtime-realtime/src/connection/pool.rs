//! Connection pool: tracks all active connections indexed by owner.

use std::sync::Arc;

use dashmap::DashMap;

use showtime_core::types::{ConnectionId, OwnerId};

use super::handle::ConnectionHandle;

/// Thread-safe pool of all active WebSocket connections.
#[derive(Debug, Default)]
pub struct ConnectionPool {
    /// Owner → connection handles, oldest first (one owner can have multiple connections).
    by_owner: DashMap<OwnerId, Vec<Arc<ConnectionHandle>>>,
    /// Connection ID → connection handle for direct lookup.
    by_id: DashMap<ConnectionId, Arc<ConnectionHandle>>,
}

impl ConnectionPool {
    /// Creates a new empty connection pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to the pool.
    pub fn add(&self, handle: Arc<ConnectionHandle>) {
        self.by_id.insert(handle.id, handle.clone());
        self.by_owner
            .entry(handle.owner_id.clone())
            .or_default()
            .push(handle);
    }

    /// Removes a connection from the pool.
    pub fn remove(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        let (_, handle) = self.by_id.remove(conn_id)?;
        if let Some(mut connections) = self.by_owner.get_mut(&handle.owner_id) {
            connections.retain(|c| c.id != *conn_id);
            if connections.is_empty() {
                drop(connections);
                self.by_owner
                    .remove_if(&handle.owner_id, |_, conns| conns.is_empty());
            }
        }
        Some(handle)
    }

    /// Gets all connections for an owner, oldest first.
    pub fn owner_connections(&self, owner_id: &OwnerId) -> Vec<Arc<ConnectionHandle>> {
        self.by_owner
            .get(owner_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Gets a specific connection by ID.
    pub fn get(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.by_id.get(conn_id).map(|entry| entry.value().clone())
    }

    /// Returns total number of active connections.
    pub fn connection_count(&self) -> usize {
        self.by_id.len()
    }

    /// Returns number of distinct connected owners.
    pub fn owner_count(&self) -> usize {
        self.by_owner.len()
    }

    /// Returns all connection handles.
    pub fn all_connections(&self) -> Vec<Arc<ConnectionHandle>> {
        self.by_id
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tokio::sync::mpsc;

    use super::*;

    fn handle(owner: &str) -> Arc<ConnectionHandle> {
        let (tx, _rx) = mpsc::channel(4);
        Arc::new(ConnectionHandle::new(
            ConnectionId::new(),
            OwnerId::parse(owner).unwrap(),
            tx,
            Utc::now(),
        ))
    }

    #[test]
    fn test_add_and_remove_by_owner() {
        let pool = ConnectionPool::new();
        let (a, b, c) = (handle("u1"), handle("u1"), handle("u2"));
        pool.add(a.clone());
        pool.add(b.clone());
        pool.add(c.clone());

        assert_eq!(pool.connection_count(), 3);
        assert_eq!(pool.owner_count(), 2);
        let owner = OwnerId::parse("u1").unwrap();
        assert_eq!(pool.owner_connections(&owner)[0].id, a.id);

        pool.remove(&a.id);
        pool.remove(&b.id);
        assert!(pool.owner_connections(&owner).is_empty());
        assert_eq!(pool.owner_count(), 1);
        assert!(pool.remove(&a.id).is_none());
    }
}
