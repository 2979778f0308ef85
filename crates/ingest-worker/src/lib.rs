//! # ingest-worker
//!
//! The bounded-concurrency worker runtime (C9, SPEC_FULL §4.7): a narrow
//! axum RPC surface (`/internal/process`, `/health`) in front of the same
//! orchestrator the CLI uses, plus the claim/heartbeat state machine and
//! startup crash recovery that make it safe to run several of these against
//! one relational store.

pub mod error;
pub mod job;
pub mod routes;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use ingest_config::IngestConfig;
use ingest_db::IngestDb;
use tower_http::trace::TraceLayer;

pub use state::AppState;

#[must_use]
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/internal/process", post(routes::process))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Open the store, sweep any runs left `running` by a prior crash, and serve
/// the RPC surface until the process is killed.
///
/// # Errors
///
/// Returns an error if the store can't be opened or the listener can't bind.
pub async fn run(config: IngestConfig) -> anyhow::Result<()> {
    let db = Arc::new(IngestDb::open_local(&config.database_url).await?);

    let swept = ingest_db::repos::run::sweep_interrupted(&db, config.crash_recovery_minutes).await?;
    if swept > 0 {
        tracing::warn!(count = swept, "swept interrupted runs to failed on startup");
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.worker_port));
    let state = AppState::new(db, Arc::new(config));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "ingest worker listening");
    axum::serve(listener, app).await?;

    Ok(())
}
