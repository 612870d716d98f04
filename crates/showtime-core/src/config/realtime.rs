//! Real-time WebSocket engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Real-time (WebSocket) engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Maximum WebSocket connections per owner; the oldest is evicted beyond it.
    #[serde(default = "default_max_connections_per_owner")]
    pub max_connections_per_owner: usize,
    /// Outbound queue size per connection.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// WebSocket ping interval in seconds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_seconds: u64,
    /// Seconds without a pong before the connection is dropped.
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout_seconds: u64,
    /// Seconds without client activity before the session releases its
    /// locks and closes.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
}

impl RealtimeConfig {
    /// Ping interval as a duration.
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_seconds)
    }

    /// Pong timeout as a duration.
    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_seconds)
    }

    /// Inactivity window as a duration.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            max_connections_per_owner: default_max_connections_per_owner(),
            channel_buffer_size: default_channel_buffer(),
            ping_interval_seconds: default_ping_interval(),
            ping_timeout_seconds: default_ping_timeout(),
            idle_timeout_seconds: default_idle_timeout(),
        }
    }
}

fn default_max_connections_per_owner() -> usize {
    5
}

fn default_channel_buffer() -> usize {
    256
}

fn default_ping_interval() -> u64 {
    30
}

fn default_ping_timeout() -> u64 {
    75
}

fn default_idle_timeout() -> u64 {
    600
}
