//! Booking repository implementation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use showtime_core::error::{AppError, ErrorKind};
use showtime_core::models::Booking;
use showtime_core::result::AppResult;
use showtime_core::types::{BookingId, EventId, OwnerId};

use super::parse_seats;

/// Raw `bookings` row.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct BookingRow {
    pub id: Uuid,
    pub owner_id: String,
    pub event_id: Uuid,
    pub seats: Vec<String>,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = AppError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let owner_id = OwnerId::parse(&row.owner_id)
            .ok_or_else(|| AppError::database(format!("Booking {} has no owner", row.id)))?;
        Ok(Self {
            id: BookingId::from_uuid(row.id),
            owner_id,
            event_id: EventId::from_uuid(row.event_id),
            seats: parse_seats(row.seats)?,
            amount: row.amount,
            created_at: row.created_at,
        })
    }
}

/// Repository for booking reads.
#[derive(Debug, Clone)]
pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    /// Create a new booking repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a booking by ID.
    pub async fn find_by_id(&self, id: BookingId) -> AppResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(
            "SELECT id, owner_id, event_id, seats, amount, created_at FROM bookings WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find booking", e))?;

        row.map(Booking::try_from).transpose()
    }

    /// List an owner's bookings, newest first.
    pub async fn find_by_owner(&self, owner_id: &OwnerId) -> AppResult<Vec<Booking>> {
        sqlx::query_as::<_, BookingRow>(
            "SELECT id, owner_id, event_id, seats, amount, created_at FROM bookings \
             WHERE owner_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list bookings", e))?
        .into_iter()
        .map(Booking::try_from)
        .collect()
    }
}
