//! Soft-lock and booking configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Longest accepted soft-lock TTL (one day).
pub const MAX_LOCK_TTL_SECONDS: u64 = 86_400;

/// Seat soft-lock settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    /// How long an unrefreshed soft lock stays live, in seconds.
    #[serde(default = "default_lock_ttl")]
    pub lock_ttl_seconds: u64,
    /// Interval of the background expiry sweep in seconds (`0` disables it;
    /// lazy sweeping on access always runs).
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

impl BookingConfig {
    /// Lock TTL as a duration.
    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_seconds)
    }

    /// Background sweep interval, if enabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_seconds > 0).then(|| Duration::from_secs(self.sweep_interval_seconds))
    }
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            lock_ttl_seconds: default_lock_ttl(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

fn default_lock_ttl() -> u64 {
    90
}

fn default_sweep_interval() -> u64 {
    15
}
