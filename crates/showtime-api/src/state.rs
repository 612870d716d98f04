//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use showtime_core::config::AppConfig;
use showtime_core::traits::seat_store::SeatStore;
use showtime_realtime::RealtimeEngine;
use showtime_service::BookingService;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Durable seat store
    pub store: Arc<dyn SeatStore>,
    /// Seat locks, fan-out, and WebSocket sessions
    pub realtime: Arc<RealtimeEngine>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("realtime", &self.realtime)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Creates the state from a running engine.
    pub fn new(config: AppConfig, store: Arc<dyn SeatStore>, realtime: Arc<RealtimeEngine>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            realtime,
            started_at: Instant::now(),
        }
    }

    /// Booking commits. Shares the engine's commit listener so HTTP commits
    /// reach WebSocket viewers too.
    pub fn bookings(&self) -> &BookingService {
        &self.realtime.bookings
    }
}
