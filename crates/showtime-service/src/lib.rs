//! # showtime-service
//!
//! Business logic for Showtime bookings. The [`BookingService`] normalizes
//! seat requests, prices them, runs the store's atomic commit, and tells the
//! realtime layer about every seat that became committed.
//!
//! Services follow constructor injection: all dependencies are provided at
//! construction time via `Arc` references.

pub mod booking;

pub use booking::{BookingReceipt, BookingService, CommitResult, normalize_seats};
