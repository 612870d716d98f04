//! Application builder: wires router, middleware, and state into an Axum app.

use std::sync::Arc;

use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use showtime_core::config::AppConfig;
use showtime_core::error::AppError;
use showtime_core::traits::clock::SystemClock;
use showtime_core::traits::seat_store::SeatStore;
use showtime_realtime::RealtimeEngine;

use crate::middleware::cors::build_cors_layer;
use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.server.cors);
    build_router(state)
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Runs the Showtime server on top of `store` until Ctrl+C.
pub async fn run_server(config: AppConfig, store: Arc<dyn SeatStore>) -> Result<(), AppError> {
    tracing::info!("Starting Showtime server...");

    let realtime = Arc::new(RealtimeEngine::new(
        &config.realtime,
        &config.booking,
        store.clone(),
        Arc::new(SystemClock),
    ));
    let sweeper = realtime.start();

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, store, realtime.clone());
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!(addr = %addr, "Showtime server listening");

    let engine = realtime.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            engine.shutdown().await;
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    if let Some(sweeper) = sweeper {
        let _ = sweeper.await;
    }
    tracing::info!("Showtime server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}
