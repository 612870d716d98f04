//! Showtime Server: seat reservation coordination.
//!
//! Main entry point that picks the seat store, wires the crates together,
//! and starts the server.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use showtime_core::config::{AppConfig, StoreProvider};
use showtime_core::error::AppError;
use showtime_core::traits::seat_store::SeatStore;
use showtime_database::{DatabasePool, MemorySeatStore, demo_event};

#[tokio::main]
async fn main() {
    let env = std::env::var("SHOWTIME_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, store = %config.store.provider, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Showtime");

    let store = open_store(&config).await?;
    showtime_api::run_server(config, store).await
}

/// Opens the configured seat store, seeding the demo event if asked to.
async fn open_store(config: &AppConfig) -> Result<Arc<dyn SeatStore>, AppError> {
    match config.store.provider {
        StoreProvider::Memory => {
            let store = MemorySeatStore::new();
            if config.store.seed_demo_event {
                let event = demo_event();
                tracing::info!(event_id = %event.id, "Seeding demo event");
                store.insert_event(event).await;
            }
            Ok(Arc::new(store))
        }
        StoreProvider::Postgres => {
            let store = DatabasePool::connect(&config.database)
                .await?
                .into_store(&config.database)
                .await?;
            if config.store.seed_demo_event {
                let event = demo_event();
                tracing::info!(event_id = %event.id, "Seeding demo event");
                store.events().create_if_absent(&event).await?;
            }
            Ok(Arc::new(store))
        }
    }
}
