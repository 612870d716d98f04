//! Typed identifiers and seat primitives.

pub mod id;
pub mod seat;

pub use id::{BookingId, ConnectionId, EventId, OwnerId};
pub use seat::{SeatId, SeatLayout};
