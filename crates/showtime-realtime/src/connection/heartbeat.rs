//! Ping/pong heartbeat and inactivity detection.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time;

use showtime_core::config::RealtimeConfig;
use showtime_core::traits::clock::Clock;

use super::handle::ConnectionHandle;
use crate::message::types::OutboundMessage;

/// Heartbeat configuration
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Interval between pings
    pub ping_interval: Duration,
    /// Timeout before considering connection dead
    pub ping_timeout: Duration,
    /// Inactivity window after which the session is ended
    pub idle_timeout: Duration,
}

impl From<&RealtimeConfig> for HeartbeatConfig {
    fn from(config: &RealtimeConfig) -> Self {
        Self {
            ping_interval: config.ping_interval(),
            ping_timeout: config.ping_timeout(),
            idle_timeout: config.idle_timeout(),
        }
    }
}

/// Why a heartbeat loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatExit {
    /// The connection was closed elsewhere.
    Closed,
    /// No pong arrived within the timeout.
    PongTimeout,
    /// The client sent no requests within the idle window.
    Idle,
}

/// Run heartbeat loop for a connection.
///
/// Sends periodic pings and checks for pong responses and inactivity. The
/// first check happens one interval after start.
pub async fn run_heartbeat(
    handle: Arc<ConnectionHandle>,
    config: HeartbeatConfig,
    clock: Arc<dyn Clock>,
) -> HeartbeatExit {
    let mut interval = time::interval_at(time::Instant::now() + config.ping_interval, config.ping_interval);

    let exit = loop {
        tokio::select! {
            _ = handle.closed() => break HeartbeatExit::Closed,
            _ = interval.tick() => {}
        }

        if !handle.is_alive() {
            break HeartbeatExit::Closed;
        }

        let now = clock.now();
        let last_pong = *handle.last_pong.read().await;
        if elapsed(now, last_pong) > config.ping_timeout {
            tracing::warn!(conn_id = %handle.id, "Connection heartbeat timeout");
            break HeartbeatExit::PongTimeout;
        }

        let last_activity = *handle.last_activity.read().await;
        if elapsed(now, last_activity) > config.idle_timeout {
            tracing::info!(conn_id = %handle.id, "Connection idle, ending session");
            break HeartbeatExit::Idle;
        }

        if !handle.reply(OutboundMessage::Ping { timestamp: now }) && !handle.is_alive() {
            tracing::debug!(conn_id = %handle.id, "Ping send failed, connection closed");
            break HeartbeatExit::Closed;
        }
    };

    tracing::debug!(conn_id = %handle.id, exit = ?exit, "Heartbeat loop ended");
    exit
}

fn elapsed(now: DateTime<Utc>, since: DateTime<Utc>) -> Duration {
    (now - since).to_std().unwrap_or(Duration::ZERO)
}
