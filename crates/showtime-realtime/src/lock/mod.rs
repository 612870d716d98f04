//! Ephemeral per-seat soft locks.

pub mod manager;
pub mod sweeper;
pub mod table;
pub mod types;

pub use manager::LockManager;
pub use table::EventLockTable;
pub use types::{AcquireOutcome, EventSnapshot, LockView, RejectReason, ReleaseFilter, SoftLock};
