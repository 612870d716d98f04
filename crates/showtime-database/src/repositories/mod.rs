//! Repository implementations for Showtime's durable records.

pub mod booking;
pub mod event;

pub use booking::BookingRepository;
pub use event::EventRepository;

use showtime_core::error::AppError;
use showtime_core::types::SeatId;

/// Parse seat ids read back from a `TEXT[]` column.
pub(crate) fn parse_seats(raw: Vec<String>) -> Result<Vec<SeatId>, AppError> {
    raw.iter().map(|s| SeatId::parse(s)).collect()
}

/// Render seat ids for binding to a `TEXT[]` parameter.
pub(crate) fn seat_strings(seats: &[SeatId]) -> Vec<String> {
    seats.iter().map(|s| s.as_str().to_string()).collect()
}
