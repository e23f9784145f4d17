// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Club routes API server
//!
//! Stores, normalizes and serves the club's GPX route library.

use club_routes::{
    config::{Config, StoreBackend},
    db::{FirestoreDb, MemoryStore, RouteStore},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting club routes API");

    let store: Arc<dyn RouteStore> = match config.store_backend {
        StoreBackend::Firestore => Arc::new(FirestoreDb::new(&config.gcp_project_id).await?),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store, data will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };
    tracing::info!(backend = store.backend_tag(), "Metadata store ready");

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), store));
    state.normalizer.files().ensure_dir().await?;
    tracing::info!(
        dir = %state.normalizer.files().dir().display(),
        "Track file directory ready"
    );

    // Build router
    let app = club_routes::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("club_routes=debug,info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}
