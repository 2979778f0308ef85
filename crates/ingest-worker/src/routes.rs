//! The worker's internal RPC surface (§4.7, §6): `/health` and `/internal/process`.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use ingest_core::RunId;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkerError};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    active_jobs: usize,
    max_concurrent: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        active_jobs: state.active_count(),
        max_concurrent: state.config.worker_max_concurrent,
    })
}

/// Only `run_id` is trusted; the rest of §6's body shape is accepted for
/// callers that still send it, but the worker re-derives doc/tenant/URI from
/// the durable run row rather than believing a second copy over RPC.
#[derive(Debug, Deserialize)]
struct ProcessRequest {
    run_id: String,
}

#[derive(Debug, Serialize)]
struct AcceptedResponse {
    status: &'static str,
    run_id: String,
}

fn check_bearer_token(state: &AppState, headers: &HeaderMap) -> Result<()> {
    if state.config.internal_auth_token.is_empty() {
        return Ok(());
    }
    let Some(value) = headers.get(axum::http::header::AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
        return Err(WorkerError::Unauthorized("missing authorization"));
    };
    let Some(token) = value.strip_prefix("Bearer ") else {
        return Err(WorkerError::Unauthorized("missing authorization"));
    };
    if token != state.config.internal_auth_token {
        return Err(WorkerError::Unauthorized("invalid authorization"));
    }
    Ok(())
}

pub async fn process(State(state): State<AppState>, headers: HeaderMap, body: axum::body::Bytes) -> Result<impl IntoResponse> {
    check_bearer_token(&state, &headers)?;

    let payload: ProcessRequest =
        serde_json::from_slice(&body).map_err(|_| WorkerError::BadRequest("invalid JSON payload".to_string()))?;
    if payload.run_id.is_empty() {
        return Err(WorkerError::BadRequest("run_id is required".to_string()));
    }

    if !state.try_admit(&payload.run_id) {
        tracing::warn!(max_concurrent = state.config.worker_max_concurrent, "worker busy, all slots occupied");
        return Err(WorkerError::Busy);
    }

    let run_id = RunId::from(payload.run_id.clone());
    tracing::info!(run_id = run_id.as_str(), active = state.active_count(), "job accepted");
    tokio::spawn(crate::job::run(state, run_id));

    Ok((StatusCode::ACCEPTED, Json(AcceptedResponse { status: "accepted", run_id: payload.run_id })))
}
