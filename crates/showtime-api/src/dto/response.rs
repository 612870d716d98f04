//! Response DTOs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use showtime_core::models::{Booking, EventRecord};
use showtime_core::types::{BookingId, EventId, SeatId};
use showtime_realtime::lock::types::{EventSnapshot, LockView};
use showtime_realtime::metrics::MetricsSnapshot;
use showtime_service::BookingReceipt;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Basic liveness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `ok` when the process answers.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Seconds since start.
    pub uptime_seconds: u64,
}

/// Liveness plus dependency and engine state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedHealthResponse {
    /// `ok` or `degraded`.
    pub status: String,
    /// Seat store reachability.
    pub store: String,
    /// Open WebSocket connections.
    pub ws_connections: usize,
    /// Distinct connected owners.
    pub online_owners: usize,
    /// Events with a lock table.
    pub loaded_events: usize,
    /// Lock and commit counters.
    pub metrics: MetricsSnapshot,
}

/// Seat map of one event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatMapResponse {
    /// Event.
    pub event_id: EventId,
    /// Title.
    pub title: String,
    /// Start time.
    pub starts_at: DateTime<Utc>,
    /// Number of rows.
    pub rows: u32,
    /// Seats per row.
    pub cols: u32,
    /// Seats neither committed nor locked.
    pub available: u64,
    /// Durably booked seats.
    pub committed_seats: Vec<SeatId>,
    /// Live soft locks.
    pub locks: BTreeMap<SeatId, LockView>,
    /// Event version the map reflects.
    pub version: u64,
}

impl SeatMapResponse {
    /// Combines the stored event with the live lock state.
    pub fn new(event: &EventRecord, snapshot: EventSnapshot) -> Self {
        let taken = snapshot.committed_seats.len() + snapshot.locks.len();
        Self {
            event_id: event.id,
            title: event.title.clone(),
            starts_at: event.starts_at,
            rows: event.layout.rows,
            cols: event.layout.cols,
            available: event.layout.capacity().saturating_sub(taken as u64),
            committed_seats: snapshot.committed_seats,
            locks: snapshot.locks,
            version: snapshot.version,
        }
    }
}

/// A booking as returned to its owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingResponse {
    /// Booking.
    pub booking_id: BookingId,
    /// Event booked.
    pub event_id: EventId,
    /// Total charged, in minor currency units.
    pub amount: i64,
    /// Seats booked.
    pub seats: Vec<SeatId>,
    /// Commit time.
    pub created_at: DateTime<Utc>,
}

impl From<BookingReceipt> for BookingResponse {
    fn from(receipt: BookingReceipt) -> Self {
        Self {
            booking_id: receipt.booking_id,
            event_id: receipt.event_id,
            amount: receipt.amount,
            seats: receipt.seats,
            created_at: receipt.created_at,
        }
    }
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            booking_id: booking.id,
            event_id: booking.event_id,
            amount: booking.amount,
            seats: booking.seats,
            created_at: booking.created_at,
        }
    }
}
