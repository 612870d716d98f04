//! Soft-lock value types.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use showtime_core::types::{ConnectionId, EventId, OwnerId, SeatId};

/// A short-lived claim on one seat by one owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftLock {
    /// Seat held.
    pub seat: SeatId,
    /// Owner holding it.
    pub owner_id: OwnerId,
    /// Connection that last acquired or refreshed it.
    pub connection_id: ConnectionId,
    /// The lock is dead once `now >= expires_at`.
    pub expires_at: DateTime<Utc>,
}

impl SoftLock {
    /// Whether the lock still holds at `now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Public view of the lock, without the connection id.
    pub fn view(&self) -> LockView {
        LockView {
            owner_id: self.owner_id.clone(),
            expires_at: self.expires_at,
        }
    }
}

/// What subscribers see for a locked seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockView {
    /// Owner holding the seat.
    pub owner_id: OwnerId,
    /// Expiry.
    pub expires_at: DateTime<Utc>,
}

/// Why a lock request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The seat is durably booked.
    AlreadyBooked,
    /// Another owner holds a live lock on the seat.
    LockedByAnother,
}

impl RejectReason {
    /// Message shown to the user.
    pub fn message(&self) -> &'static str {
        match self {
            Self::AlreadyBooked => "Seat already booked",
            Self::LockedByAnother => "Seat locked by another user",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Result of a lock request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// The caller holds the lock (newly or refreshed).
    Granted(SoftLock),
    /// The seat is unavailable.
    Rejected(RejectReason),
}

/// Selects the locks removed by a bulk release.
///
/// A lock matches when either criterion matches. An empty filter matches
/// nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseFilter {
    /// Match locks held by this owner.
    pub owner_id: Option<OwnerId>,
    /// Match locks acquired through this connection.
    pub connection_id: Option<ConnectionId>,
}

impl ReleaseFilter {
    /// Locks held by `owner_id` or acquired through `connection_id`.
    pub fn owner_or_connection(owner_id: OwnerId, connection_id: ConnectionId) -> Self {
        Self {
            owner_id: Some(owner_id),
            connection_id: Some(connection_id),
        }
    }

    /// Locks acquired through one connection.
    pub fn connection(connection_id: ConnectionId) -> Self {
        Self {
            owner_id: None,
            connection_id: Some(connection_id),
        }
    }

    /// Whether a lock is selected.
    pub fn matches(&self, lock: &SoftLock) -> bool {
        self.owner_id.as_ref() == Some(&lock.owner_id)
            || self.connection_id == Some(lock.connection_id)
    }
}

/// Point-in-time seat state of one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventSnapshot {
    /// Event.
    pub event_id: EventId,
    /// Durably booked seats, sorted.
    pub committed_seats: Vec<SeatId>,
    /// Live locks.
    pub locks: BTreeMap<SeatId, LockView>,
    /// Event version this snapshot reflects.
    pub version: u64,
}
