//! Core traits defined in `showtime-core` and implemented by other crates.

pub mod clock;
pub mod commit;
pub mod seat_store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use commit::{CommitListener, CommittedSeats};
pub use seat_store::{CommitOutcome, SeatStore};
