use persona_core::context::ContextId;
use persona_core::error::CoreError;

/// Errors surfaced synchronously by [`JobRegistry`](crate::JobRegistry).
///
/// Failures that happen once polling has started never appear here; they
/// are absorbed into the job's log and status.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// The context already has an active job.
    #[error("Context '{0}' already has an active generation job")]
    RegistryConflict(ContextId),

    /// The provider refused the request. `message` is the provider's text.
    #[error("Generation request for '{context_id}' was rejected: {message}")]
    SubmissionRejected {
        context_id: ContextId,
        message: String,
    },

    /// No job is tracked for the context.
    #[error("No generation job for context '{0}'")]
    NotFound(ContextId),

    /// The job exists but is no longer active.
    #[error("Generation job for '{0}' is not active")]
    NotActive(ContextId),

    /// The registry was shut down and accepts no new jobs.
    #[error("Job registry is shutting down")]
    ShuttingDown,

    /// Domain validation or state machine error.
    #[error(transparent)]
    Core(#[from] CoreError),
}
