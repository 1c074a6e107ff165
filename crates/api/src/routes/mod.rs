pub mod content;
pub mod health;
pub mod jobs;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /ws                          WebSocket job feed
/// /jobs                        generation jobs
/// /owners/{owner_id}/content   content ledger listing
/// /content                     content ledger writes
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/jobs", jobs::router())
        .merge(content::router())
}
