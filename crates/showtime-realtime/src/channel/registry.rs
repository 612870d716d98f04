//! Channel registry: manages all event channels and subscriptions.

use dashmap::DashMap;

use showtime_core::types::{ConnectionId, EventId};

use super::channel::Channel;
use super::subscription::SubscriptionTracker;

/// Registry of all watched events.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    /// Event → channel.
    channels: DashMap<EventId, Channel>,
    /// Subscription tracker (reverse index).
    subscriptions: SubscriptionTracker,
}

impl ChannelRegistry {
    /// Creates a new channel registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes a connection to an event. Returns `false` if it was
    /// already subscribed.
    pub fn subscribe(&self, event_id: EventId, conn_id: ConnectionId) -> bool {
        let added = self
            .channels
            .entry(event_id)
            .or_insert_with(|| Channel::new(event_id))
            .subscribe(conn_id);

        self.subscriptions.add(conn_id, event_id);
        added
    }

    /// Unsubscribes a connection from one event.
    pub fn unsubscribe(&self, event_id: EventId, conn_id: ConnectionId) {
        self.detach(event_id, conn_id);
        self.subscriptions.remove(conn_id, event_id);
    }

    /// Unsubscribes a connection from every event.
    pub fn unsubscribe_all(&self, conn_id: ConnectionId) {
        for event_id in self.subscriptions.remove_all(conn_id) {
            self.detach(event_id, conn_id);
        }
    }

    /// Returns all subscriber connection IDs for an event.
    pub fn get_subscribers(&self, event_id: EventId) -> Vec<ConnectionId> {
        self.channels
            .get(&event_id)
            .map(|ch| ch.get_subscribers())
            .unwrap_or_default()
    }

    /// Whether a connection watches an event.
    pub fn is_subscribed(&self, event_id: EventId, conn_id: ConnectionId) -> bool {
        self.subscriptions.get_events(conn_id).contains(&event_id)
    }

    /// Returns subscriber count for an event.
    pub fn channel_subscriber_count(&self, event_id: EventId) -> usize {
        self.channels
            .get(&event_id)
            .map(|ch| ch.subscriber_count())
            .unwrap_or(0)
    }

    /// Returns total number of watched events.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn detach(&self, event_id: EventId, conn_id: ConnectionId) {
        if let Some(mut channel) = self.channels.get_mut(&event_id) {
            channel.unsubscribe(conn_id);
            if channel.is_empty() {
                drop(channel);
                self.channels.remove_if(&event_id, |_, ch| ch.is_empty());
            }
        }
    }
}
