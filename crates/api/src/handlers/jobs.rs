//! Handlers for the `/jobs` resource.
//!
//! Jobs are keyed by context id. Starting a job blocks until the provider
//! has acknowledged the request; polling then continues in the background
//! and progress is observed via `GET /jobs/{context_id}` or the WebSocket
//! feed.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use persona_core::context::ContextId;
use persona_core::job::StartJob;
use persona_tracker::TrackerError;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Start
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs
///
/// Start a job. Returns 201 with the job snapshot once the provider has
/// accepted the request, 409 if the context is busy and 502 if the
/// provider refused.
pub async fn start_job(
    State(state): State<AppState>,
    Json(input): Json<StartJob>,
) -> AppResult<impl IntoResponse> {
    let handle = state.registry.start(input).await?;
    let job = handle.snapshot();

    tracing::info!(
        context_id = %job.context_id,
        status = %job.status,
        "Job started via API",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: job })))
}

// ---------------------------------------------------------------------------
// List / get
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs
pub async fn list_jobs(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let jobs = state.registry.list().await;
    Ok(Json(DataResponse { data: jobs }))
}

/// GET /api/v1/jobs/{context_id}
///
/// Snapshot including the full event log.
pub async fn get_job(
    State(state): State<AppState>,
    Path(context_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let context_id = ContextId::new(context_id);
    let job = state
        .registry
        .get(&context_id)
        .await
        .ok_or(TrackerError::NotFound(context_id))?;
    Ok(Json(DataResponse { data: job }))
}

// ---------------------------------------------------------------------------
// Cancel / evict
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs/{context_id}/cancel
///
/// Stops local polling. The provider request itself is not retracted.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(context_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let job = state.registry.cancel(&ContextId::new(context_id)).await?;
    Ok(Json(DataResponse { data: job }))
}

/// DELETE /api/v1/jobs/{context_id}
///
/// Forget a finished job. Returns 409 while the job is still active.
pub async fn evict_job(
    State(state): State<AppState>,
    Path(context_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.registry.evict(&ContextId::new(context_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
