use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the ledger is unreachable.
    pub status: &'static str,
    pub version: &'static str,
    pub ledger_healthy: bool,
    /// Jobs currently submitting or polling.
    pub active_jobs: usize,
}

/// GET /health -- returns service and ledger health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let ledger_healthy = state.ledger.ping().await.is_ok();
    let status = if ledger_healthy { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        ledger_healthy,
        active_jobs: state.registry.active_count().await,
    })
}

/// Mount health check routes (root level, not under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
