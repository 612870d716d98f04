//! Connection sessions: per-client event subscription and cleanup.

pub mod manager;
pub mod state;

pub use manager::SessionManager;
pub use state::SessionState;
