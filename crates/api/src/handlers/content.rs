//! Handlers for the content ledger.
//!
//! Job submitters record confirmed items here; the tracker itself only
//! reads the ledger.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use persona_core::error::CoreError;
use persona_core::types::DbId;
use persona_db::models::content::{ContentFilter, CreateContent};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/owners/{owner_id}/content
///
/// Newest first. Optional `kind` and `style` query filters; `style` is
/// matched case-insensitively.
pub async fn list_owner_content(
    State(state): State<AppState>,
    Path(owner_id): Path<DbId>,
    Query(filter): Query<ContentFilter>,
) -> AppResult<impl IntoResponse> {
    let items = state.ledger.list_for_owner(owner_id, &filter).await?;
    Ok(Json(DataResponse { data: items }))
}

/// POST /api/v1/content
pub async fn create_content(
    State(state): State<AppState>,
    Json(input): Json<CreateContent>,
) -> AppResult<impl IntoResponse> {
    if input.url.trim().is_empty() {
        return Err(AppError::BadRequest("url must not be empty".into()));
    }
    if input.style.as_deref().is_some_and(|s| s.trim().is_empty()) {
        return Err(AppError::BadRequest("style must not be blank".into()));
    }

    let item = state.ledger.create(&input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: item })))
}

/// DELETE /api/v1/content/{id}
pub async fn delete_content(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    if state.ledger.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(CoreError::NotFound {
            entity: "Content item",
            id: id.to_string(),
        }
        .into())
    }
}
