//! Event repository implementation.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use showtime_core::error::{AppError, ErrorKind};
use showtime_core::models::{EventRecord, Pricing};
use showtime_core::result::AppResult;
use showtime_core::types::{EventId, SeatLayout};

use super::{parse_seats, seat_strings};

/// Raw `events` row.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct EventRow {
    pub id: Uuid,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub seat_rows: i32,
    pub seat_cols: i32,
    pub price: i64,
    pub seat_pricing: Json<BTreeMap<String, i64>>,
    pub committed_seats: Vec<String>,
}

impl TryFrom<EventRow> for EventRecord {
    type Error = AppError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let rows = u32::try_from(row.seat_rows)
            .map_err(|_| AppError::database(format!("Event {} has a negative row count", row.id)))?;
        let cols = u32::try_from(row.seat_cols)
            .map_err(|_| AppError::database(format!("Event {} has a negative column count", row.id)))?;
        Ok(Self {
            id: EventId::from_uuid(row.id),
            title: row.title,
            starts_at: row.starts_at,
            layout: SeatLayout::new(rows, cols)?,
            pricing: Pricing {
                price: row.price,
                tiers: row.seat_pricing.0,
            },
            committed_seats: parse_seats(row.committed_seats)?.into_iter().collect::<BTreeSet<_>>(),
        })
    }
}

/// Repository for event lookups and seeding.
#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    /// Create a new event repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find an event by ID.
    pub async fn find_by_id(&self, id: EventId) -> AppResult<Option<EventRecord>> {
        let row = sqlx::query_as::<_, EventRow>(
            "SELECT id, title, starts_at, seat_rows, seat_cols, price, seat_pricing, committed_seats \
             FROM events WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find event", e))?;

        row.map(EventRecord::try_from).transpose()
    }

    /// Insert an event if it does not exist yet. Existing rows are left
    /// untouched so committed seats survive a restart.
    pub async fn create_if_absent(&self, event: &EventRecord) -> AppResult<()> {
        let seats: Vec<_> = event.committed_seats.iter().cloned().collect();
        sqlx::query(
            "INSERT INTO events (id, title, starts_at, seat_rows, seat_cols, price, seat_pricing, committed_seats) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) ON CONFLICT (id) DO NOTHING",
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(event.starts_at)
        .bind(i32::try_from(event.layout.rows).unwrap_or(i32::MAX))
        .bind(i32::try_from(event.layout.cols).unwrap_or(i32::MAX))
        .bind(event.pricing.price)
        .bind(Json(&event.pricing.tiers))
        .bind(seat_strings(&seats))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create event", e))?;
        Ok(())
    }
}
