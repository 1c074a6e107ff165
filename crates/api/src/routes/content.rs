use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::content;
use crate::state::AppState;

/// Content ledger routes.
///
/// ```text
/// GET    /owners/{owner_id}/content   -> list_owner_content
/// POST   /content                     -> create_content
/// DELETE /content/{id}                -> delete_content
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/owners/{owner_id}/content", get(content::list_owner_content))
        .route("/content", post(content::create_content))
        .route("/content/{id}", delete(content::delete_content))
}
