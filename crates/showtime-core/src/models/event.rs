//! Bookable event model and its pricing rule.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::id::EventId;
use crate::types::seat::{SeatId, SeatLayout};

/// Tier key used when a row has no explicit price.
pub const DEFAULT_TIER: &str = "DEFAULT";

/// One scheduled showing with a fixed seat universe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event ID.
    pub id: EventId,
    /// Display title.
    pub title: String,
    /// Scheduled start.
    pub starts_at: DateTime<Utc>,
    /// Seat grid.
    pub layout: SeatLayout,
    /// Price rule applied at commit time.
    pub pricing: Pricing,
    /// Durably booked seats.
    pub committed_seats: BTreeSet<SeatId>,
}

impl EventRecord {
    /// Whether a seat has been durably booked.
    pub fn is_committed(&self, seat: &SeatId) -> bool {
        self.committed_seats.contains(seat)
    }
}

/// Flat per-seat price with optional per-row tiers.
///
/// The price of a seat is `tiers[row]`, falling back to `tiers["DEFAULT"]`,
/// falling back to `price`. Amounts are in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    /// Flat per-seat price.
    pub price: i64,
    /// Row label → price. Empty means flat pricing.
    #[serde(default)]
    pub tiers: BTreeMap<String, i64>,
}

impl Pricing {
    /// Flat pricing.
    pub fn flat(price: i64) -> Self {
        Self {
            price,
            tiers: BTreeMap::new(),
        }
    }

    /// Price of a single seat.
    pub fn seat_price(&self, seat: &SeatId) -> i64 {
        if self.tiers.is_empty() {
            return self.price;
        }
        self.tiers
            .get(seat.row_label())
            .or_else(|| self.tiers.get(DEFAULT_TIER))
            .copied()
            .unwrap_or(self.price)
    }

    /// Total for a set of seats.
    pub fn total<'a>(&self, seats: impl IntoIterator<Item = &'a SeatId>) -> i64 {
        seats
            .into_iter()
            .map(|seat| self.seat_price(seat))
            .fold(0i64, i64::saturating_add)
    }
}
