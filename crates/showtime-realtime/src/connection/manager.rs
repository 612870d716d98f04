//! Connection manager: handles connection registration and removal.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use showtime_core::config::RealtimeConfig;
use showtime_core::traits::clock::Clock;
use showtime_core::types::{ConnectionId, OwnerId};

use crate::channel::broker::EventBroker;
use crate::metrics::EngineMetrics;

use super::handle::{ConnectionHandle, Outbound};
use super::pool::ConnectionPool;

/// A freshly registered connection.
#[derive(Debug)]
pub struct Registration {
    /// Handle of the new connection.
    pub handle: Arc<ConnectionHandle>,
    /// Receiver for messages queued to the client.
    pub receiver: mpsc::Receiver<Outbound>,
    /// Older connections of the same owner that exceed the per-owner limit
    /// and must be closed by the caller.
    pub evicted: Vec<Arc<ConnectionHandle>>,
}

/// Manages all active WebSocket connections.
#[derive(Debug)]
pub struct ConnectionManager {
    /// Connection pool.
    pool: Arc<ConnectionPool>,
    /// Event broker.
    broker: Arc<EventBroker>,
    /// Metrics.
    metrics: Arc<EngineMetrics>,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Configuration.
    config: RealtimeConfig,
}

impl ConnectionManager {
    /// Creates a new connection manager.
    pub fn new(
        config: RealtimeConfig,
        pool: Arc<ConnectionPool>,
        broker: Arc<EventBroker>,
        metrics: Arc<EngineMetrics>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pool,
            broker,
            metrics,
            clock,
            config,
        }
    }

    /// Registers a new connection.
    ///
    /// Callers without an identity get a per-connection guest owner id.
    pub fn register(&self, owner_id: Option<OwnerId>) -> Registration {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size);
        let id = ConnectionId::new();
        let owner_id = owner_id.unwrap_or_else(|| OwnerId::guest(id));
        let handle = Arc::new(ConnectionHandle::new(id, owner_id, tx, self.clock.now()));

        let existing = self.pool.owner_connections(&handle.owner_id);
        let max = self.config.max_connections_per_owner.max(1);
        let excess = (existing.len() + 1).saturating_sub(max);
        if excess > 0 {
            warn!(
                owner_id = %handle.owner_id,
                count = existing.len(),
                max = max,
                "Owner at max connections, oldest will be replaced"
            );
        }
        let evicted = existing.into_iter().take(excess).collect();

        self.pool.add(handle.clone());
        self.metrics.connection_opened();

        info!(
            conn_id = %handle.id,
            owner_id = %handle.owner_id,
            "WebSocket connection registered"
        );

        Registration {
            handle,
            receiver: rx,
            evicted,
        }
    }

    /// Unregisters a connection and drops its event memberships.
    pub fn unregister(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        let handle = self.pool.remove(conn_id)?;
        handle.close();
        self.broker.unsubscribe(*conn_id);
        self.metrics.connection_closed();

        info!(
            conn_id = %conn_id,
            owner_id = %handle.owner_id,
            "WebSocket connection unregistered"
        );
        Some(handle)
    }

    /// Gets a connection by ID.
    pub fn get(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.pool.get(conn_id)
    }

    /// Returns all connection handles.
    pub fn all_connections(&self) -> Vec<Arc<ConnectionHandle>> {
        self.pool.all_connections()
    }

    /// Returns total number of active connections.
    pub fn connection_count(&self) -> usize {
        self.pool.connection_count()
    }

    /// Returns number of distinct connected owners.
    pub fn owner_count(&self) -> usize {
        self.pool.owner_count()
    }
}
