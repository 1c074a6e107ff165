use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Routes mounted at `/jobs`.
///
/// ```text
/// GET    /                        -> list_jobs
/// POST   /                        -> start_job
/// GET    /{context_id}            -> get_job
/// DELETE /{context_id}            -> evict_job
/// POST   /{context_id}/cancel     -> cancel_job
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(jobs::list_jobs).post(jobs::start_job))
        .route("/{context_id}", get(jobs::get_job).delete(jobs::evict_job))
        .route("/{context_id}/cancel", post(jobs::cancel_job))
}
