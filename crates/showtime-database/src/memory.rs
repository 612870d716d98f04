//! In-memory seat store using a Tokio mutex for single-node deployments.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use showtime_core::error::AppError;
use showtime_core::models::{Booking, EventRecord, NewBooking};
use showtime_core::result::AppResult;
use showtime_core::traits::seat_store::{CommitOutcome, SeatStore};
use showtime_core::types::{BookingId, EventId, OwnerId};

/// Internal state for the memory-based seat store.
#[derive(Debug, Default)]
struct InnerState {
    /// Events by ID, including their committed seats.
    events: HashMap<EventId, EventRecord>,
    /// Bookings in commit order.
    bookings: Vec<Booking>,
}

/// In-memory seat store.
///
/// Every commit runs inside one critical section, which gives the same
/// all-or-nothing guarantee as the PostgreSQL transaction. Data is lost on
/// restart.
#[derive(Debug, Clone, Default)]
pub struct MemorySeatStore {
    /// Protected inner state.
    state: Arc<Mutex<InnerState>>,
}

impl MemorySeatStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an event.
    pub async fn insert_event(&self, event: EventRecord) {
        let mut state = self.state.lock().await;
        info!(event_id = %event.id, title = %event.title, "Event registered");
        state.events.insert(event.id, event);
    }
}

#[async_trait]
impl SeatStore for MemorySeatStore {
    async fn find_event(&self, event_id: EventId) -> AppResult<Option<EventRecord>> {
        let state = self.state.lock().await;
        Ok(state.events.get(&event_id).cloned())
    }

    async fn commit_booking(&self, booking: NewBooking) -> AppResult<CommitOutcome> {
        let mut state = self.state.lock().await;

        let event = state
            .events
            .get_mut(&booking.event_id)
            .ok_or_else(|| AppError::not_found(format!("Event {} not found", booking.event_id)))?;

        let conflicting_seats: Vec<_> = booking
            .seats
            .iter()
            .filter(|seat| event.committed_seats.contains(seat))
            .cloned()
            .collect();

        if !conflicting_seats.is_empty() {
            debug!(
                event_id = %booking.event_id,
                conflicting = conflicting_seats.len(),
                "Conditional seat write rejected"
            );
            return Ok(CommitOutcome::Conflict { conflicting_seats });
        }

        event.committed_seats.extend(booking.seats.iter().cloned());
        let committed_seats = event.committed_seats.iter().cloned().collect();

        let record = Booking {
            id: BookingId::new(),
            owner_id: booking.owner_id,
            event_id: booking.event_id,
            seats: booking.seats,
            amount: booking.amount,
            created_at: Utc::now(),
        };
        state.bookings.push(record.clone());

        Ok(CommitOutcome::Committed {
            booking: record,
            committed_seats,
        })
    }

    async fn find_booking(&self, booking_id: BookingId) -> AppResult<Option<Booking>> {
        let state = self.state.lock().await;
        Ok(state.bookings.iter().find(|b| b.id == booking_id).cloned())
    }

    async fn bookings_for_owner(&self, owner_id: &OwnerId) -> AppResult<Vec<Booking>> {
        let state = self.state.lock().await;
        Ok(state
            .bookings
            .iter()
            .rev()
            .filter(|b| &b.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
