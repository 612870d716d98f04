//! Seat state store trait: the durable owner of committed seats.

use async_trait::async_trait;

use crate::models::{Booking, EventRecord, NewBooking};
use crate::result::AppResult;
use crate::types::id::{BookingId, EventId, OwnerId};
use crate::types::seat::SeatId;

/// Result of an atomic commit attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// All seats were added and the booking record was created.
    Committed {
        /// The new booking.
        booking: Booking,
        /// The event's full committed set after the write, sorted.
        committed_seats: Vec<SeatId>,
    },
    /// At least one requested seat was already committed; nothing changed.
    Conflict {
        /// Exactly the requested seats that were already committed.
        conflicting_seats: Vec<SeatId>,
    },
}

/// Durable store for events, committed seats, and bookings.
///
/// Implementations must make [`SeatStore::commit_booking`] atomic: the
/// "add these seats only if none is already present" write and the booking
/// record insert either both happen or neither does. Two implementations are
/// provided:
/// - PostgreSQL (conditional `UPDATE` + `INSERT` in one transaction)
/// - In-memory (using `tokio::sync::Mutex`)
#[async_trait]
pub trait SeatStore: Send + Sync + 'static {
    /// Fetch an event with its layout, pricing, and committed seats.
    async fn find_event(&self, event_id: EventId) -> AppResult<Option<EventRecord>>;

    /// Atomically add the booking's seats to the event's committed set,
    /// guarded by "none already present", and create the booking record.
    ///
    /// Returns a not-found error if the event does not exist.
    async fn commit_booking(&self, booking: NewBooking) -> AppResult<CommitOutcome>;

    /// Fetch a booking by ID.
    async fn find_booking(&self, booking_id: BookingId) -> AppResult<Option<Booking>>;

    /// All bookings made by an owner, newest first.
    async fn bookings_for_owner(&self, owner_id: &OwnerId) -> AppResult<Vec<Booking>>;

    /// Check that the store backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}
