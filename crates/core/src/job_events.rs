//! Event names published on the event bus and message types pushed to
//! WebSocket clients for generation job lifecycle updates.

/// Provider accepted the request; polling has started.
pub const EVENT_JOB_SUBMITTED: &str = "generation_job.submitted";
/// Progress estimate changed on a tick.
pub const EVENT_JOB_PROGRESS: &str = "generation_job.progress";
/// All expected items were found.
pub const EVENT_JOB_COMPLETED: &str = "generation_job.completed";
/// Attempt budget exhausted before all items were found.
pub const EVENT_JOB_DEGRADED: &str = "generation_job.degraded";
/// Rejected by the provider or cancelled by the caller.
pub const EVENT_JOB_FAILED: &str = "generation_job.failed";

/// WebSocket message type for [`EVENT_JOB_SUBMITTED`].
pub const MSG_TYPE_JOB_SUBMITTED: &str = "job_submitted";
/// WebSocket message type for [`EVENT_JOB_PROGRESS`].
pub const MSG_TYPE_JOB_PROGRESS: &str = "job_progress";
/// WebSocket message type for [`EVENT_JOB_COMPLETED`].
pub const MSG_TYPE_JOB_COMPLETED: &str = "job_completed";
/// WebSocket message type for [`EVENT_JOB_DEGRADED`].
pub const MSG_TYPE_JOB_DEGRADED: &str = "job_degraded";
/// WebSocket message type for [`EVENT_JOB_FAILED`].
pub const MSG_TYPE_JOB_FAILED: &str = "job_failed";

/// Map a bus event name to its WebSocket message type.
pub fn ws_message_type(event_type: &str) -> Option<&'static str> {
    match event_type {
        EVENT_JOB_SUBMITTED => Some(MSG_TYPE_JOB_SUBMITTED),
        EVENT_JOB_PROGRESS => Some(MSG_TYPE_JOB_PROGRESS),
        EVENT_JOB_COMPLETED => Some(MSG_TYPE_JOB_COMPLETED),
        EVENT_JOB_DEGRADED => Some(MSG_TYPE_JOB_DEGRADED),
        EVENT_JOB_FAILED => Some(MSG_TYPE_JOB_FAILED),
        _ => None,
    }
}
