//! Atomic booking commit.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use showtime_core::error::AppError;
use showtime_core::models::{Booking, EventRecord, NewBooking};
use showtime_core::traits::commit::{CommitListener, CommittedSeats};
use showtime_core::traits::seat_store::{CommitOutcome, SeatStore};
use showtime_core::types::{BookingId, EventId, OwnerId, SeatId};

use super::normalize::{check_layout, normalize_seats};

/// Confirmation returned to the committing owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingReceipt {
    /// The new booking.
    pub booking_id: BookingId,
    /// Event booked.
    pub event_id: EventId,
    /// Total charged, in minor currency units.
    pub amount: i64,
    /// Seats booked, in request order.
    pub seats: Vec<SeatId>,
    /// Commit time.
    pub created_at: DateTime<Utc>,
}

impl From<&Booking> for BookingReceipt {
    fn from(booking: &Booking) -> Self {
        Self {
            booking_id: booking.id,
            event_id: booking.event_id,
            amount: booking.amount,
            seats: booking.seats.clone(),
            created_at: booking.created_at,
        }
    }
}

/// Result of a commit attempt. A conflict is a normal outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitResult {
    /// Every requested seat was committed.
    Booked(BookingReceipt),
    /// Some requested seats were already committed; nothing was written.
    Conflict {
        /// The requested seats that were already committed.
        conflicting_seats: Vec<SeatId>,
    },
}

/// Turns a seat selection into a durable booking.
#[derive(Clone)]
pub struct BookingService {
    /// Durable seat store.
    store: Arc<dyn SeatStore>,
    /// Notified after every successful commit.
    listener: Arc<dyn CommitListener>,
}

impl fmt::Debug for BookingService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BookingService").finish_non_exhaustive()
    }
}

impl BookingService {
    /// Creates a new booking service.
    pub fn new(store: Arc<dyn SeatStore>, listener: Arc<dyn CommitListener>) -> Self {
        Self { store, listener }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn SeatStore> {
        &self.store
    }

    /// Loads an event or fails with not-found.
    pub async fn get_event(&self, event_id: EventId) -> Result<EventRecord, AppError> {
        self.store
            .find_event(event_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Event {event_id} not found")))
    }

    /// Commits a seat selection for an owner.
    ///
    /// Seats are normalized before the event is looked up, checked against
    /// its layout and priced, then added to the event's committed set by a
    /// single conditional store write that also records the booking. The
    /// commit listener brackets the write: it holds the seats from just
    /// before the write until it learns the outcome. Store failures are
    /// returned as-is and never retried.
    pub async fn commit<S: AsRef<str>>(
        &self,
        event_id: EventId,
        owner_id: &OwnerId,
        raw_seats: &[S],
    ) -> Result<CommitResult, AppError> {
        let seats = normalize_seats(raw_seats)?;
        let event = self.get_event(event_id).await?;
        check_layout(&seats, &event.layout)?;
        let amount = event.pricing.total(&seats);

        self.listener.commit_started(&event, &seats).await;
        let outcome = match self
            .store
            .commit_booking(NewBooking {
                owner_id: owner_id.clone(),
                event_id,
                seats: seats.clone(),
                amount,
            })
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(event_id = %event_id, owner_id = %owner_id, error = %e, "Booking commit failed");
                self.listener.commit_abandoned(event_id, &seats).await;
                return Err(e);
            }
        };

        match outcome {
            CommitOutcome::Committed {
                booking,
                committed_seats,
            } => {
                info!(
                    booking_id = %booking.id,
                    event_id = %event_id,
                    owner_id = %owner_id,
                    seats = booking.seats.len(),
                    amount = booking.amount,
                    "Booking committed"
                );

                self.listener
                    .seats_committed(CommittedSeats {
                        event_id,
                        owner_id: owner_id.clone(),
                        seats: booking.seats.clone(),
                        all_committed: committed_seats,
                    })
                    .await;

                Ok(CommitResult::Booked(BookingReceipt::from(&booking)))
            }
            CommitOutcome::Conflict { conflicting_seats } => {
                info!(
                    event_id = %event_id,
                    owner_id = %owner_id,
                    conflicting = ?conflicting_seats.iter().map(SeatId::as_str).collect::<Vec<_>>(),
                    "Booking conflict"
                );
                self.listener.commit_abandoned(event_id, &seats).await;
                Ok(CommitResult::Conflict { conflicting_seats })
            }
        }
    }

    /// All bookings of an owner, newest first.
    pub async fn bookings_for_owner(&self, owner_id: &OwnerId) -> Result<Vec<Booking>, AppError> {
        self.store.bookings_for_owner(owner_id).await
    }

    /// One of the owner's bookings. Other owners' bookings are reported as
    /// not found.
    pub async fn get_booking(
        &self,
        owner_id: &OwnerId,
        booking_id: BookingId,
    ) -> Result<Booking, AppError> {
        self.store
            .find_booking(booking_id)
            .await?
            .filter(|b| &b.owner_id == owner_id)
            .ok_or_else(|| AppError::not_found(format!("Booking {booking_id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use showtime_core::error::ErrorKind;
    use showtime_core::models::Pricing;
    use showtime_core::result::AppResult;
    use showtime_core::types::SeatLayout;
    use showtime_database::MemorySeatStore;

    use super::*;

    #[derive(Default)]
    struct RecordingListener {
        started: Mutex<Vec<Vec<SeatId>>>,
        commits: Mutex<Vec<CommittedSeats>>,
        abandoned: Mutex<Vec<Vec<SeatId>>>,
    }

    #[async_trait]
    impl CommitListener for RecordingListener {
        async fn commit_started(&self, _event: &EventRecord, seats: &[SeatId]) {
            self.started.lock().unwrap().push(seats.to_vec());
        }

        async fn seats_committed(&self, commit: CommittedSeats) {
            self.commits.lock().unwrap().push(commit);
        }

        async fn commit_abandoned(&self, _event_id: EventId, seats: &[SeatId]) {
            self.abandoned.lock().unwrap().push(seats.to_vec());
        }
    }

    struct UnavailableStore;

    #[async_trait]
    impl SeatStore for UnavailableStore {
        async fn find_event(&self, event_id: EventId) -> AppResult<Option<EventRecord>> {
            Ok(Some(event_with_id(event_id)))
        }

        async fn commit_booking(&self, _booking: NewBooking) -> AppResult<CommitOutcome> {
            Err(AppError::service_unavailable("store offline"))
        }

        async fn find_booking(&self, _booking_id: BookingId) -> AppResult<Option<Booking>> {
            Ok(None)
        }

        async fn bookings_for_owner(&self, _owner_id: &OwnerId) -> AppResult<Vec<Booking>> {
            Ok(Vec::new())
        }

        async fn health_check(&self) -> AppResult<bool> {
            Ok(false)
        }
    }

    fn event_with_id(id: EventId) -> EventRecord {
        let mut tiers = BTreeMap::new();
        tiers.insert("A".to_string(), 1500);
        tiers.insert("DEFAULT".to_string(), 1000);
        EventRecord {
            id,
            title: "Late Show".to_string(),
            starts_at: Utc::now(),
            layout: SeatLayout::new(10, 12).unwrap(),
            pricing: Pricing { price: 900, tiers },
            committed_seats: BTreeSet::new(),
        }
    }

    async fn setup() -> (BookingService, Arc<RecordingListener>, EventId) {
        let store = MemorySeatStore::new();
        let event = event_with_id(EventId::new());
        let event_id = event.id;
        store.insert_event(event).await;
        let listener = Arc::new(RecordingListener::default());
        let service = BookingService::new(Arc::new(store), listener.clone());
        (service, listener, event_id)
    }

    fn owner(raw: &str) -> OwnerId {
        OwnerId::parse(raw).unwrap()
    }

    fn seats(ids: &[&str]) -> Vec<SeatId> {
        ids.iter().map(|s| SeatId::parse(s).unwrap()).collect()
    }

    #[tokio::test]
    async fn test_commit_prices_and_notifies_listener() {
        let (service, listener, event_id) = setup().await;

        let result = service
            .commit(event_id, &owner("u1"), &["a1", "C1", "A1"])
            .await
            .unwrap();

        let CommitResult::Booked(receipt) = result else {
            panic!("expected booking");
        };
        assert_eq!(receipt.seats, seats(&["A1", "C1"]));
        assert_eq!(receipt.amount, 2500);

        let commits = listener.commits.lock().unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].seats, seats(&["A1", "C1"]));
        assert_eq!(commits[0].all_committed, seats(&["A1", "C1"]));
    }

    #[tokio::test]
    async fn test_second_commit_on_same_seats_conflicts() {
        let (service, listener, event_id) = setup().await;

        service
            .commit(event_id, &owner("u1"), &["C1", "C2"])
            .await
            .unwrap();
        let result = service
            .commit(event_id, &owner("u2"), &["C2", "C3"])
            .await
            .unwrap();

        assert_eq!(
            result,
            CommitResult::Conflict {
                conflicting_seats: seats(&["C2"])
            }
        );
        assert_eq!(listener.commits.lock().unwrap().len(), 1);
        assert_eq!(listener.started.lock().unwrap().len(), 2);
        assert_eq!(*listener.abandoned.lock().unwrap(), vec![seats(&["C2", "C3"])]);
        let event = service.get_event(event_id).await.unwrap();
        assert!(!event.is_committed(&SeatId::parse("C3").unwrap()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_commits_have_single_winner() {
        let (service, listener, event_id) = setup().await;

        let attempts = (0..8).map(|i| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .commit(event_id, &owner(&format!("u{i}")), &["E5", "E6"])
                    .await
            })
        });
        let results = futures::future::join_all(attempts).await;

        let booked = results
            .iter()
            .filter(|r| matches!(r, Ok(Ok(CommitResult::Booked(_)))))
            .count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Ok(Ok(CommitResult::Conflict { .. }))))
            .count();
        assert_eq!(booked, 1);
        assert_eq!(conflicts, 7);
        assert_eq!(listener.commits.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_selection_is_validation_error() {
        let (service, listener, event_id) = setup().await;
        let err = service
            .commit(event_id, &owner("u1"), &["  ", ""])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.message, "No valid seats provided");
        assert!(listener.commits.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_input_is_checked_before_event_lookup() {
        let (service, listener, _event_id) = setup().await;
        let err = service
            .commit(EventId::new(), &owner("u1"), &[" ", ""])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.message, "No valid seats provided");

        let err = service
            .commit(EventId::new(), &owner("u1"), &["1A"])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(listener.started.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_seat_outside_layout_never_reaches_store() {
        let (service, listener, event_id) = setup().await;
        let err = service
            .commit(event_id, &owner("u1"), &["A1", "Z1"])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(listener.started.lock().unwrap().is_empty());
        let event = service.get_event(event_id).await.unwrap();
        assert!(event.committed_seats.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_event_is_not_found() {
        let (service, _listener, _event_id) = setup().await;
        let err = service
            .commit(EventId::new(), &owner("u1"), &["A1"])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_store_failure_is_surfaced_without_notification() {
        let listener = Arc::new(RecordingListener::default());
        let service = BookingService::new(Arc::new(UnavailableStore), listener.clone());

        let err = service
            .commit(EventId::new(), &owner("u1"), &["A1"])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ServiceUnavailable);
        assert!(listener.commits.lock().unwrap().is_empty());
        assert_eq!(*listener.started.lock().unwrap(), vec![seats(&["A1"])]);
        assert_eq!(*listener.abandoned.lock().unwrap(), vec![seats(&["A1"])]);
    }

    #[tokio::test]
    async fn test_get_booking_is_scoped_to_owner() {
        let (service, _listener, event_id) = setup().await;
        let CommitResult::Booked(receipt) = service
            .commit(event_id, &owner("u1"), &["B2"])
            .await
            .unwrap()
        else {
            panic!("expected booking");
        };

        assert!(service.get_booking(&owner("u1"), receipt.booking_id).await.is_ok());
        let err = service
            .get_booking(&owner("u2"), receipt.booking_id)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(service.bookings_for_owner(&owner("u1")).await.unwrap().len(), 1);
    }
}
