//! Durable booking record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::id::{BookingId, EventId, OwnerId};
use crate::types::seat::SeatId;

/// A committed booking. Created exactly once per successful commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Booking ID.
    pub id: BookingId,
    /// Who booked.
    pub owner_id: OwnerId,
    /// Which event.
    pub event_id: EventId,
    /// Exactly the seats added to the event's committed set by this booking.
    pub seats: Vec<SeatId>,
    /// Total charged, in minor currency units.
    pub amount: i64,
    /// When the booking was committed.
    pub created_at: DateTime<Utc>,
}

/// Data needed to commit a booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    /// Who is booking.
    pub owner_id: OwnerId,
    /// Which event.
    pub event_id: EventId,
    /// Normalized, de-duplicated seats.
    pub seats: Vec<SeatId>,
    /// Precomputed total.
    pub amount: i64,
}
