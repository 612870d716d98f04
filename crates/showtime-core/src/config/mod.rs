//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod app;
pub mod booking;
pub mod database;
pub mod logging;
pub mod realtime;

use serde::{Deserialize, Serialize};

pub use self::app::{CorsConfig, ServerConfig};
pub use self::booking::{BookingConfig, MAX_LOCK_TTL_SECONDS};
pub use self::database::{DatabaseConfig, StoreConfig, StoreProvider};
pub use self::logging::LoggingConfig;
pub use self::realtime::RealtimeConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Seat store backend selection.
    #[serde(default)]
    pub store: StoreConfig,
    /// Database connection settings (used by the `postgres` store).
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Soft-lock and booking settings.
    #[serde(default)]
    pub booking: BookingConfig,
    /// Real-time WebSocket settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `SHOWTIME__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("SHOWTIME")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let loaded: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Rejects settings that would break the soft-lock contract.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.booking.lock_ttl_seconds == 0 {
            return Err(AppError::configuration(
                "booking.lock_ttl_seconds must be greater than zero",
            ));
        }
        if self.booking.lock_ttl_seconds > MAX_LOCK_TTL_SECONDS {
            return Err(AppError::configuration(format!(
                "booking.lock_ttl_seconds must be at most {MAX_LOCK_TTL_SECONDS}"
            )));
        }
        if self.realtime.channel_buffer_size == 0 {
            return Err(AppError::configuration(
                "realtime.channel_buffer_size must be greater than zero",
            ));
        }
        if self.store.provider == StoreProvider::Postgres && self.database.url.is_empty() {
            return Err(AppError::configuration(
                "database.url is required when store.provider = \"postgres\"",
            ));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            database: DatabaseConfig::default(),
            booking: BookingConfig::default(),
            realtime: RealtimeConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
