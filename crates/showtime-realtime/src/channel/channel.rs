//! Single event channel with subscriber tracking.

use std::collections::HashSet;

use showtime_core::types::{ConnectionId, EventId};

/// The viewers of one event.
#[derive(Debug, Clone)]
pub struct Channel {
    /// Event watched.
    pub event_id: EventId,
    /// Set of subscribed connection IDs.
    pub subscribers: HashSet<ConnectionId>,
}

impl Channel {
    /// Creates a new empty channel.
    pub fn new(event_id: EventId) -> Self {
        Self {
            event_id,
            subscribers: HashSet::new(),
        }
    }

    /// Adds a subscriber. Returns `false` if it was already present.
    pub fn subscribe(&mut self, conn_id: ConnectionId) -> bool {
        self.subscribers.insert(conn_id)
    }

    /// Removes a subscriber.
    pub fn unsubscribe(&mut self, conn_id: ConnectionId) {
        self.subscribers.remove(&conn_id);
    }

    /// Returns subscriber count.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Returns whether the channel has any subscribers.
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Returns all subscriber connection IDs.
    pub fn get_subscribers(&self) -> Vec<ConnectionId> {
        self.subscribers.iter().copied().collect()
    }
}
