//! Inbound and outbound WebSocket message type definitions.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use showtime_core::types::{BookingId, EventId, SeatId};

use crate::lock::types::{EventSnapshot, LockView, RejectReason};

/// Messages sent by the client to the server.
///
/// Seat ids arrive as raw strings and are canonicalized by the session so a
/// malformed seat can be reported against the request that carried it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Start viewing an event.
    Subscribe {
        /// Event to view.
        event_id: EventId,
    },
    /// Soft-lock (or refresh) a seat.
    AcquireLock {
        /// Event the seat belongs to.
        event_id: EventId,
        /// Seat to lock.
        seat_id: String,
    },
    /// Drop a soft lock.
    ReleaseLock {
        /// Event the seat belongs to.
        event_id: EventId,
        /// Seat to release.
        seat_id: String,
    },
    /// Book a set of seats.
    Commit {
        /// Event to book.
        event_id: EventId,
        /// Seats to book.
        seats: Vec<String>,
    },
    /// Stop viewing an event and end the session.
    Leave {
        /// Event being left.
        event_id: EventId,
    },
    /// Pong response to server ping.
    Pong {
        /// Echoed timestamp.
        #[serde(default)]
        timestamp: Option<i64>,
    },
}

impl InboundMessage {
    /// Message type name for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Subscribe { .. } => "subscribe",
            Self::AcquireLock { .. } => "acquire_lock",
            Self::ReleaseLock { .. } => "release_lock",
            Self::Commit { .. } => "commit",
            Self::Leave { .. } => "leave",
            Self::Pong { .. } => "pong",
        }
    }
}

/// Messages sent by the server to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Full seat state, sent once on subscribe.
    Snapshot {
        /// Event.
        event_id: EventId,
        /// Durably booked seats.
        committed_seats: Vec<SeatId>,
        /// Live soft locks.
        locks: BTreeMap<SeatId, LockView>,
        /// Event version the snapshot reflects.
        version: u64,
    },
    /// The caller now holds the seat's soft lock.
    LockGranted {
        /// Event.
        event_id: EventId,
        /// Seat locked.
        seat_id: SeatId,
        /// When the lock lapses unless refreshed.
        expires_at: DateTime<Utc>,
    },
    /// The seat could not be locked.
    LockRejected {
        /// Event.
        event_id: EventId,
        /// Seat requested.
        seat_id: SeatId,
        /// Machine-readable reason.
        code: RejectReason,
        /// Human-readable reason.
        reason: String,
    },
    /// The event's live lock map changed.
    LocksChanged {
        /// Event.
        event_id: EventId,
        /// Live soft locks after the change.
        locks: BTreeMap<SeatId, LockView>,
        /// Event version after the change.
        version: u64,
    },
    /// Seats were durably booked.
    CommittedSeatsChanged {
        /// Event.
        event_id: EventId,
        /// Full committed set after the change.
        committed_seats: Vec<SeatId>,
        /// Event version after the change.
        version: u64,
    },
    /// The caller's commit succeeded.
    CommitSucceeded {
        /// Event.
        event_id: EventId,
        /// New booking.
        booking_id: BookingId,
        /// Total charged.
        amount: i64,
        /// Seats booked.
        seats: Vec<SeatId>,
    },
    /// The caller's commit lost a race.
    CommitConflict {
        /// Event.
        event_id: EventId,
        /// Requested seats that were already booked.
        conflicting_seats: Vec<SeatId>,
    },
    /// Server keepalive ping.
    Ping {
        /// Server time.
        timestamp: DateTime<Utc>,
    },
    /// The server ended the session.
    SessionClosed {
        /// Why the session ended (`idle`, `left`, `replaced`, `shutdown`).
        reason: String,
    },
    /// Request failed.
    Error {
        /// Error code.
        code: String,
        /// Description.
        message: String,
    },
}

impl OutboundMessage {
    /// Builds the reply for a snapshot.
    pub fn snapshot(snapshot: EventSnapshot) -> Self {
        Self::Snapshot {
            event_id: snapshot.event_id,
            committed_seats: snapshot.committed_seats,
            locks: snapshot.locks,
            version: snapshot.version,
        }
    }

    /// Builds an error reply.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Builds a session-closed notice.
    pub fn session_closed(reason: impl Into<String>) -> Self {
        Self::SessionClosed {
            reason: reason.into(),
        }
    }
}
