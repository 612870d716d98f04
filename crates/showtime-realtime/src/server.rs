//! Top-level real-time engine that ties together all subsystems.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;

use showtime_core::config::{BookingConfig, RealtimeConfig};
use showtime_core::traits::clock::Clock;
use showtime_core::traits::seat_store::SeatStore;
use showtime_service::booking::BookingService;

use crate::channel::broker::EventBroker;
use crate::connection::heartbeat::HeartbeatConfig;
use crate::connection::manager::ConnectionManager;
use crate::connection::pool::ConnectionPool;
use crate::lock::manager::LockManager;
use crate::lock::sweeper::spawn_sweeper;
use crate::metrics::{EngineMetrics, MetricsSnapshot};
use crate::session::manager::SessionManager;

/// Central real-time engine that coordinates seat locks and sessions.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Connection manager.
    pub connections: Arc<ConnectionManager>,
    /// Event fan-out.
    pub broker: Arc<EventBroker>,
    /// Soft-lock state of every loaded event.
    pub locks: Arc<LockManager>,
    /// Session lifecycle and request routing.
    pub sessions: Arc<SessionManager>,
    /// Booking commits. Successful commits are applied to `locks`.
    pub bookings: BookingService,
    /// Metrics collector.
    pub metrics: Arc<EngineMetrics>,
    sweep_interval: Option<std::time::Duration>,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine").finish()
    }
}

/// Point-in-time engine statistics.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    /// Open connections.
    pub connections: usize,
    /// Distinct connected owners.
    pub owners: usize,
    /// Events with a lock table.
    pub loaded_events: usize,
    /// Events with at least one viewer.
    pub watched_events: usize,
    /// Counters.
    pub metrics: MetricsSnapshot,
}

impl RealtimeEngine {
    /// Creates a new real-time engine on top of `store`.
    pub fn new(
        realtime: &RealtimeConfig,
        booking: &BookingConfig,
        store: Arc<dyn SeatStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        let metrics = Arc::new(EngineMetrics::new());
        let pool = Arc::new(ConnectionPool::new());
        let broker = Arc::new(EventBroker::new(pool.clone(), metrics.clone()));
        let locks = Arc::new(LockManager::new(
            broker.clone(),
            clock.clone(),
            booking.lock_ttl(),
            metrics.clone(),
        ));
        let bookings = BookingService::new(store, locks.clone());
        let connections = Arc::new(ConnectionManager::new(
            realtime.clone(),
            pool,
            broker.clone(),
            metrics.clone(),
            clock.clone(),
        ));
        let sessions = Arc::new(SessionManager::new(
            connections.clone(),
            broker.clone(),
            locks.clone(),
            bookings.clone(),
            metrics.clone(),
            clock,
            HeartbeatConfig::from(realtime),
        ));

        info!(
            lock_ttl_secs = booking.lock_ttl_seconds,
            max_connections_per_owner = realtime.max_connections_per_owner,
            "Real-time engine initialized"
        );

        Self {
            connections,
            broker,
            locks,
            sessions,
            bookings,
            metrics,
            sweep_interval: booking.sweep_interval(),
            shutdown_tx,
        }
    }

    /// Starts the periodic lock sweeper, if one is configured. Must be
    /// called from within a Tokio runtime.
    pub fn start(&self) -> Option<JoinHandle<()>> {
        let interval = self.sweep_interval?;
        Some(spawn_sweeper(
            self.locks.clone(),
            interval,
            self.shutdown_tx.subscribe(),
        ))
    }

    /// Returns a shutdown receiver for graceful shutdown coordination.
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Current statistics.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            connections: self.connections.connection_count(),
            owners: self.connections.owner_count(),
            loaded_events: self.locks.loaded_events(),
            watched_events: self.broker.active_events(),
            metrics: self.metrics.snapshot(),
        }
    }

    /// Stops background tasks and closes every session.
    pub async fn shutdown(&self) {
        info!("Shutting down real-time engine");

        let _ = self.shutdown_tx.send(());
        self.sessions.close_all("shutdown").await;

        info!("Real-time engine shut down");
    }
}
