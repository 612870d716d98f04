//! # showtime-realtime
//!
//! Real-time seat coordination engine for Showtime. Provides:
//!
//! - Per-event soft-lock tables with TTL expiry and a periodic sweeper
//! - Event channels that fan lock and committed-seat changes out to viewers
//! - WebSocket connection management with heartbeat and idle expiry
//! - Connection sessions that release a viewer's locks when they go away

pub mod channel;
pub mod connection;
pub mod lock;
pub mod message;
pub mod metrics;
pub mod server;
pub mod session;

pub use channel::broker::EventBroker;
pub use connection::manager::ConnectionManager;
pub use lock::manager::LockManager;
pub use server::RealtimeEngine;
pub use session::manager::SessionManager;
