//! Event channel broker: membership plus best-effort fan-out.

use std::sync::Arc;

use tracing::{debug, trace};

use showtime_core::types::{ConnectionId, EventId};

use crate::connection::pool::ConnectionPool;
use crate::message::types::OutboundMessage;
use crate::metrics::EngineMetrics;

use super::registry::ChannelRegistry;

/// Groups connections by event and delivers messages to them.
///
/// Delivery never waits: each message is pushed into the receiver's bounded
/// outbound queue with `try_send`, so one slow client cannot stall an
/// event's lock operations.
#[derive(Debug)]
pub struct EventBroker {
    registry: ChannelRegistry,
    pool: Arc<ConnectionPool>,
    metrics: Arc<EngineMetrics>,
}

impl EventBroker {
    /// Creates a broker delivering to connections in `pool`.
    pub fn new(pool: Arc<ConnectionPool>, metrics: Arc<EngineMetrics>) -> Self {
        Self {
            registry: ChannelRegistry::new(),
            pool,
            metrics,
        }
    }

    /// Adds a connection to an event's audience.
    ///
    /// Snapshots are produced by the lock manager's `join`, which calls this
    /// while holding the event's lock.
    pub fn subscribe(&self, event_id: EventId, conn_id: ConnectionId) {
        if self.registry.subscribe(event_id, conn_id) {
            EngineMetrics::inc(&self.metrics.subscriptions_total);
            debug!(event_id = %event_id, conn_id = %conn_id, "Subscribed to event");
        }
    }

    /// Removes a connection from one event's audience.
    pub fn unsubscribe_from(&self, event_id: EventId, conn_id: ConnectionId) {
        self.registry.unsubscribe(event_id, conn_id);
    }

    /// Removes a connection from every audience. Locks are not touched.
    pub fn unsubscribe(&self, conn_id: ConnectionId) {
        self.registry.unsubscribe_all(conn_id);
    }

    /// Whether a connection watches an event.
    pub fn is_subscribed(&self, event_id: EventId, conn_id: ConnectionId) -> bool {
        self.registry.is_subscribed(event_id, conn_id)
    }

    /// Number of connections watching an event.
    pub fn audience(&self, event_id: EventId) -> usize {
        self.registry.channel_subscriber_count(event_id)
    }

    /// Number of events with at least one viewer.
    pub fn active_events(&self) -> usize {
        self.registry.channel_count()
    }

    /// Delivers `message` to every viewer of the event. Returns the number
    /// of connections it was queued for.
    pub fn broadcast(&self, event_id: EventId, message: OutboundMessage) -> usize {
        let message = Arc::new(message);
        let mut delivered = 0;

        for conn_id in self.registry.get_subscribers(event_id) {
            let Some(handle) = self.pool.get(&conn_id) else {
                continue;
            };
            if handle.send(message.clone()) {
                delivered += 1;
            } else {
                EngineMetrics::inc(&self.metrics.messages_dropped);
            }
        }

        EngineMetrics::add(&self.metrics.messages_sent, delivered);
        trace!(event_id = %event_id, delivered, "Broadcast");
        delivered
    }

    /// Sends a direct reply to one connection.
    pub fn send(&self, conn_id: ConnectionId, message: OutboundMessage) -> bool {
        let sent = self
            .pool
            .get(&conn_id)
            .is_some_and(|handle| handle.reply(message));
        if sent {
            EngineMetrics::inc(&self.metrics.messages_sent);
        }
        sent
    }
}
