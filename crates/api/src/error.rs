use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use persona_core::error::CoreError;
use persona_tracker::{LedgerError, TrackerError};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps the library error enums and adds HTTP-specific variants.
/// Renders as `{ "error": message, "code": CODE }`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Registry rejections: busy context, provider refusal, unknown job.
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

type ErrorParts = (StatusCode, &'static str, String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),
            AppError::Tracker(err) => classify_tracker_error(err),
            AppError::Ledger(err) => classify_ledger_error(err),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> ErrorParts {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

fn classify_core_error(err: &CoreError) -> ErrorParts {
    match err {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            internal()
        }
    }
}

/// Map registry errors.
///
/// - `RegistryConflict` and `NotActive` map to 409.
/// - `SubmissionRejected` maps to 502 and carries the provider's message.
/// - `NotFound` maps to 404.
/// - `ShuttingDown` maps to 503.
fn classify_tracker_error(err: &TrackerError) -> ErrorParts {
    match err {
        TrackerError::RegistryConflict(_) => (StatusCode::CONFLICT, "CONTEXT_BUSY", err.to_string()),
        TrackerError::NotActive(_) => (StatusCode::CONFLICT, "JOB_NOT_ACTIVE", err.to_string()),
        TrackerError::SubmissionRejected { .. } => (
            StatusCode::BAD_GATEWAY,
            "SUBMISSION_REJECTED",
            err.to_string(),
        ),
        TrackerError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
        TrackerError::ShuttingDown => (
            StatusCode::SERVICE_UNAVAILABLE,
            "SHUTTING_DOWN",
            err.to_string(),
        ),
        TrackerError::Core(core) => classify_core_error(core),
    }
}

fn classify_ledger_error(err: &LedgerError) -> ErrorParts {
    match err {
        LedgerError::Database(sqlx::Error::RowNotFound) => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        other => {
            tracing::error!(error = %other, "Ledger error");
            internal()
        }
    }
}
