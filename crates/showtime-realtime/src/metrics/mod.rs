//! Realtime engine metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Engine-level metrics counters.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Total messages queued to clients
    pub messages_sent: AtomicU64,
    /// Messages not delivered because a client queue was full or closed
    pub messages_dropped: AtomicU64,
    /// Total messages received
    pub messages_received: AtomicU64,
    /// Total connections established
    pub connections_total: AtomicU64,
    /// Total connections currently active
    pub connections_active: AtomicU64,
    /// Total subscribe operations
    pub subscriptions_total: AtomicU64,
    /// Locks granted or refreshed
    pub locks_granted: AtomicU64,
    /// Lock requests refused
    pub locks_rejected: AtomicU64,
    /// Locks removed by release, teardown or commit
    pub locks_released: AtomicU64,
    /// Locks removed because they expired
    pub locks_expired: AtomicU64,
    /// Successful commits
    pub commits_succeeded: AtomicU64,
    /// Commits that lost a race
    pub commits_conflicted: AtomicU64,
}

impl EngineMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment a counter by one
    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment a counter by `n`
    pub fn add(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// Record a newly registered connection
    pub fn connection_opened(&self) {
        Self::inc(&self.connections_total);
        Self::inc(&self.connections_active);
    }

    /// Record a closed connection
    pub fn connection_closed(&self) {
        let _ = self
            .connections_active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            subscriptions_total: self.subscriptions_total.load(Ordering::Relaxed),
            locks_granted: self.locks_granted.load(Ordering::Relaxed),
            locks_rejected: self.locks_rejected.load(Ordering::Relaxed),
            locks_released: self.locks_released.load(Ordering::Relaxed),
            locks_expired: self.locks_expired.load(Ordering::Relaxed),
            commits_succeeded: self.commits_succeeded.load(Ordering::Relaxed),
            commits_conflicted: self.commits_conflicted.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Total messages queued to clients
    pub messages_sent: u64,
    /// Messages dropped on full queues
    pub messages_dropped: u64,
    /// Total messages received
    pub messages_received: u64,
    /// Total connections ever established
    pub connections_total: u64,
    /// Currently active connections
    pub connections_active: u64,
    /// Total subscribe operations
    pub subscriptions_total: u64,
    /// Locks granted or refreshed
    pub locks_granted: u64,
    /// Lock requests refused
    pub locks_rejected: u64,
    /// Locks released
    pub locks_released: u64,
    /// Locks expired
    pub locks_expired: u64,
    /// Successful commits
    pub commits_succeeded: u64,
    /// Conflicting commits
    pub commits_conflicted: u64,
}
