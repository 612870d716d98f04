//! Domain models shared by the store, service, and realtime layers.

pub mod booking;
pub mod event;

pub use booking::{Booking, NewBooking};
pub use event::{EventRecord, Pricing};
