//! Subscription tracking: which events each connection watches.

use std::collections::HashSet;

use dashmap::DashMap;

use showtime_core::types::{ConnectionId, EventId};

/// Tracks connection-to-event subscription mappings (reverse index).
#[derive(Debug, Default)]
pub struct SubscriptionTracker {
    /// Connection ID → set of events.
    conn_to_events: DashMap<ConnectionId, HashSet<EventId>>,
}

impl SubscriptionTracker {
    /// Creates a new subscription tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a subscription.
    pub fn add(&self, conn_id: ConnectionId, event_id: EventId) {
        self.conn_to_events.entry(conn_id).or_default().insert(event_id);
    }

    /// Removes a subscription.
    pub fn remove(&self, conn_id: ConnectionId, event_id: EventId) {
        let now_empty = match self.conn_to_events.get_mut(&conn_id) {
            Some(mut events) => {
                events.remove(&event_id);
                events.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.conn_to_events.remove_if(&conn_id, |_, events| events.is_empty());
        }
    }

    /// Gets all events a connection is subscribed to.
    pub fn get_events(&self, conn_id: ConnectionId) -> HashSet<EventId> {
        self.conn_to_events
            .get(&conn_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Removes all subscriptions for a connection.
    pub fn remove_all(&self, conn_id: ConnectionId) -> HashSet<EventId> {
        self.conn_to_events
            .remove(&conn_id)
            .map(|(_, events)| events)
            .unwrap_or_default()
    }
}
