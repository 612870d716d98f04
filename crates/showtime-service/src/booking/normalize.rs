//! Seat request normalization.

use std::collections::HashSet;

use showtime_core::error::AppError;
use showtime_core::types::{SeatId, SeatLayout};

/// Canonicalize a raw seat list.
///
/// Entries are trimmed and upper-cased, blanks are dropped and duplicates
/// removed keeping the first occurrence. An empty result or a malformed id
/// is a validation error. Needs no event, so it runs before any lookup.
pub fn normalize_seats<S: AsRef<str>>(raw: &[S]) -> Result<Vec<SeatId>, AppError> {
    let mut seen = HashSet::new();
    let mut seats = Vec::with_capacity(raw.len());

    for entry in raw {
        let entry = entry.as_ref();
        if entry.trim().is_empty() {
            continue;
        }
        let seat = SeatId::parse(entry)?;
        if seen.insert(seat.clone()) {
            seats.push(seat);
        }
    }

    if seats.is_empty() {
        return Err(AppError::validation("No valid seats provided"));
    }
    Ok(seats)
}

/// Rejects the first seat that does not exist in `layout`.
pub fn check_layout(seats: &[SeatId], layout: &SeatLayout) -> Result<(), AppError> {
    match seats.iter().find(|seat| !layout.contains(seat)) {
        Some(seat) => Err(AppError::validation(format!(
            "Seat {seat} does not exist for this event"
        ))),
        None => Ok(()),
    }
}
