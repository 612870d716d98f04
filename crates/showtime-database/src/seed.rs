//! Demo event used when `store.seed_demo_event` is enabled.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, Utc};
use uuid::Uuid;

use showtime_core::models::event::DEFAULT_TIER;
use showtime_core::models::{EventRecord, Pricing};
use showtime_core::types::{EventId, SeatLayout};

/// Stable ID of the demo event so clients can hard-code it.
pub const DEMO_EVENT_ID: Uuid = Uuid::from_u128(0x5e0f_7a1e_0000_4000_8000_000000000001);

/// A 10x12 hall with premium front rows.
pub fn demo_event() -> EventRecord {
    let mut tiers = BTreeMap::new();
    tiers.insert("A".to_string(), 1500);
    tiers.insert("B".to_string(), 1500);
    tiers.insert(DEFAULT_TIER.to_string(), 1000);

    EventRecord {
        id: EventId::from_uuid(DEMO_EVENT_ID),
        title: "Opening Night".to_string(),
        starts_at: Utc::now() + Duration::days(1),
        layout: SeatLayout { rows: 10, cols: 12 },
        pricing: Pricing { price: 1000, tiers },
        committed_seats: BTreeSet::new(),
    }
}
