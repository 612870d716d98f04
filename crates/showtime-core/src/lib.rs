//! # showtime-core
//!
//! Core crate for Showtime. Contains configuration schemas, typed
//! identifiers, seat and layout types, the event/booking models, the seams
//! implemented by other crates (seat store, commit listener, clock), and the
//! unified error system.
//!
//! This crate has **no** internal dependencies on other Showtime crates.

pub mod config;
pub mod error;
pub mod models;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
