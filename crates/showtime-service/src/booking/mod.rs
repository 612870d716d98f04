//! Booking commit service.

pub mod normalize;
pub mod service;

pub use normalize::{check_layout, normalize_seats};
pub use service::{BookingReceipt, BookingService, CommitResult};
