//! # showtime-database
//!
//! Seat store implementations for Showtime: a PostgreSQL store built on
//! `sqlx` with a transactional conditional write, and an in-memory store
//! for single-node deployments and tests.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod seed;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemorySeatStore;
pub use store::PgSeatStore;
pub use seed::{DEMO_EVENT_ID, demo_event};
