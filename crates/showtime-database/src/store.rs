//! PostgreSQL-backed seat store.
//!
//! The commit path runs in a single transaction: a conditional `UPDATE`
//! appends the seats only when none of them is already committed, then the
//! booking row is inserted. When the guard fails the overlap is read back in
//! the same transaction so the caller learns exactly which seats clashed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;

use showtime_core::error::{AppError, ErrorKind};
use showtime_core::models::{Booking, EventRecord, NewBooking};
use showtime_core::result::AppResult;
use showtime_core::traits::seat_store::{CommitOutcome, SeatStore};
use showtime_core::types::{BookingId, EventId, OwnerId};

use crate::repositories::{BookingRepository, EventRepository, parse_seats, seat_strings};

/// Seat store backed by the `events` and `bookings` tables.
#[derive(Debug, Clone)]
pub struct PgSeatStore {
    pool: PgPool,
    events: EventRepository,
    bookings: BookingRepository,
}

impl PgSeatStore {
    /// Create a new store on top of a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            events: EventRepository::new(pool.clone()),
            bookings: BookingRepository::new(pool.clone()),
            pool,
        }
    }

    /// Event repository, used for seeding.
    pub fn events(&self) -> &EventRepository {
        &self.events
    }
}

fn db_err(message: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, message, e)
}

#[async_trait]
impl SeatStore for PgSeatStore {
    async fn find_event(&self, event_id: EventId) -> AppResult<Option<EventRecord>> {
        self.events.find_by_id(event_id).await
    }

    async fn commit_booking(&self, booking: NewBooking) -> AppResult<CommitOutcome> {
        let seats = seat_strings(&booking.seats);
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin commit transaction"))?;

        let updated: Option<Vec<String>> = sqlx::query_scalar(
            "UPDATE events SET committed_seats = committed_seats || $2::text[], updated_at = NOW() \
             WHERE id = $1 AND NOT (committed_seats && $2::text[]) \
             RETURNING committed_seats",
        )
        .bind(booking.event_id)
        .bind(&seats)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err("Failed to update committed seats"))?;

        let Some(all_committed) = updated else {
            let existing: Option<Vec<String>> = sqlx::query_scalar(
                "SELECT ARRAY(SELECT unnest(committed_seats) INTERSECT SELECT unnest($2::text[])) \
                 FROM events WHERE id = $1",
            )
            .bind(booking.event_id)
            .bind(&seats)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err("Failed to read conflicting seats"))?;

            tx.rollback()
                .await
                .map_err(db_err("Failed to roll back commit transaction"))?;

            let Some(overlap) = existing else {
                return Err(AppError::not_found(format!(
                    "Event {} not found",
                    booking.event_id
                )));
            };

            let overlap = parse_seats(overlap)?;
            let conflicting_seats = booking
                .seats
                .iter()
                .filter(|seat| overlap.contains(seat))
                .cloned()
                .collect::<Vec<_>>();
            debug!(
                event_id = %booking.event_id,
                conflicting = conflicting_seats.len(),
                "Conditional seat write rejected"
            );
            return Ok(CommitOutcome::Conflict { conflicting_seats });
        };

        let booking_id = BookingId::new();
        let created_at: DateTime<Utc> = sqlx::query_scalar(
            "INSERT INTO bookings (id, owner_id, event_id, seats, amount) \
             VALUES ($1, $2, $3, $4, $5) RETURNING created_at",
        )
        .bind(booking_id)
        .bind(booking.owner_id.as_str())
        .bind(booking.event_id)
        .bind(&seats)
        .bind(booking.amount)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err("Failed to insert booking"))?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit booking transaction"))?;

        let mut committed_seats = parse_seats(all_committed)?;
        committed_seats.sort();

        debug!(
            booking_id = %booking_id,
            event_id = %booking.event_id,
            owner_id = %booking.owner_id,
            seats = seats.len(),
            "Booking row inserted"
        );

        Ok(CommitOutcome::Committed {
            booking: Booking {
                id: booking_id,
                owner_id: booking.owner_id,
                event_id: booking.event_id,
                seats: booking.seats,
                amount: booking.amount,
                created_at,
            },
            committed_seats,
        })
    }

    async fn find_booking(&self, booking_id: BookingId) -> AppResult<Option<Booking>> {
        self.bookings.find_by_id(booking_id).await
    }

    async fn bookings_for_owner(&self, owner_id: &OwnerId) -> AppResult<Vec<Booking>> {
        self.bookings.find_by_owner(owner_id).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(|e| {
                AppError::with_source(ErrorKind::ServiceUnavailable, "Database unreachable", e)
            })
    }
}
