//! Integration tests for `JobRegistry`.
//!
//! Run on a paused clock: polling sleeps advance instantly whenever every
//! task is idle, so a 60-attempt job finishes without real waiting.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use persona_core::content::ContentKind;
use persona_core::context::ContextId;
use persona_core::error::CoreError;
use persona_core::event_log::LogLevel;
use persona_core::job::{JobStatus, StartJob, ABANDONED_REASON, CANCELLED_REASON};
use persona_core::job_events::{
    EVENT_JOB_COMPLETED, EVENT_JOB_FAILED, EVENT_JOB_SUBMITTED,
};
use persona_core::polling::PollingPolicy;
use persona_events::EventBus;
use persona_tracker::testing::{InMemoryLedger, ScriptedGateway};
use persona_tracker::{JobRegistry, TrackerError};

const OWNER: i64 = 7;

struct Harness {
    ledger: Arc<InMemoryLedger>,
    gateway: Arc<ScriptedGateway>,
    events: Arc<EventBus>,
    registry: JobRegistry,
}

fn harness(gateway: impl FnOnce(Arc<InMemoryLedger>) -> ScriptedGateway) -> Harness {
    let ledger = Arc::new(InMemoryLedger::new());
    let gateway = Arc::new(gateway(Arc::clone(&ledger)));
    let events = Arc::new(EventBus::default());
    let registry = JobRegistry::new(
        ledger.clone(),
        gateway.clone(),
        PollingPolicy::default(),
        Arc::clone(&events),
    );
    Harness {
        ledger,
        gateway,
        events,
        registry,
    }
}

fn styled(style: &str, target_count: u32, max_attempts: u32) -> StartJob {
    StartJob {
        context_id: ContextId::styled_image(OWNER, style),
        owner_id: OWNER,
        kind: ContentKind::StyledImage,
        style: Some(style.to_string()),
        target_count,
        max_attempts: Some(max_attempts),
        brief: serde_json::json!({"prompt": "city at night"}),
    }
}

// ---------------------------------------------------------------------------
// Test: a provider that finishes instantly is still detected
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn instant_provider_output_counts_as_new() {
    let h = harness(|ledger| ScriptedGateway::accepting().fulfil_into(ledger));
    h.ledger.push(OWNER, ContentKind::StyledImage, Some("noir"));

    let mut handle = h.registry.start(styled("noir", 2, 10)).await.unwrap();
    let job = handle.wait().await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.baseline_count, 1);
    assert_eq!(job.matched_items.len(), 2);
    assert_eq!(job.attempts, 1);
    assert_eq!(h.gateway.requests().len(), 1);
    assert_eq!(h.gateway.requests()[0].count, 2);
}

// ---------------------------------------------------------------------------
// Test: rejection fails the job without polling
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn rejected_submission_fails_immediately() {
    let h = harness(|_| ScriptedGateway::rejecting("quota exceeded"));
    let request = styled("noir", 1, 10);
    let context_id = request.context_id.clone();

    let result = h.registry.start(request).await;

    assert_matches!(
        result,
        Err(TrackerError::SubmissionRejected { ref message, .. }) if message == "quota exceeded"
    );
    let job = h.registry.get(&context_id).await.unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.attempts, 0);
    assert!(job.submitted_at.is_some());
    let errors: Vec<_> = job.log.at_level(LogLevel::Error).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "quota exceeded");

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(h.ledger.list_calls(), 0);
}

// ---------------------------------------------------------------------------
// Test: second start on a busy context is rejected
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn busy_context_rejects_second_start() {
    let h = harness(|_| ScriptedGateway::accepting());

    let first = h.registry.start(styled("noir", 1, 60)).await.unwrap();
    let second = h.registry.start(styled("noir", 3, 60)).await;

    assert_matches!(second, Err(TrackerError::RegistryConflict(_)));
    assert_eq!(h.registry.list().await.len(), 1);
    assert_eq!(first.snapshot().target_count, 1);
    assert_eq!(h.gateway.requests().len(), 1);
}

// ---------------------------------------------------------------------------
// Test: a dropped start frees its context
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn abandoned_start_frees_the_context() {
    let h = harness(|_| ScriptedGateway::accepting());
    h.gateway.stall_next(1);
    let mut rx = h.events.subscribe();
    let request = styled("noir", 1, 60);
    let context_id = request.context_id.clone();

    let timed_out = tokio::time::timeout(Duration::from_secs(30), h.registry.start(request)).await;
    assert!(timed_out.is_err());

    tokio::time::sleep(Duration::from_secs(3600)).await;
    let job = h.registry.get(&context_id).await.unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.submitted_at.is_some());
    assert_eq!(job.log.last().unwrap().message, ABANDONED_REASON);
    assert_eq!(h.registry.active_count().await, 0);

    let event = rx.recv().await.unwrap();
    assert_eq!(event.event_type, EVENT_JOB_FAILED);

    let restarted = h.registry.start(styled("noir", 1, 60)).await.unwrap();
    assert_eq!(restarted.snapshot().status, JobStatus::Polling);
    assert_eq!(h.gateway.requests().len(), 2);
}

// ---------------------------------------------------------------------------
// Test: concurrent jobs for different contexts do not interfere
// ---------------------------------------------------------------------------


#[tokio::test(start_paused = true)]
async fn concurrent_jobs_are_isolated() {
    let h = harness(|_| ScriptedGateway::accepting());

    let mut noir = h.registry.start(styled("noir", 1, 10)).await.unwrap();
    let mut pastel = h.registry.start(styled("pastel", 1, 4)).await.unwrap();
    // Produced before the first check; only the noir job may claim it.
    h.ledger.push(OWNER, ContentKind::StyledImage, Some("NOIR"));

    let noir = noir.wait().await;
    let pastel = pastel.wait().await;

    assert_eq!(noir.status, JobStatus::Completed);
    assert_eq!(noir.attempts, 1);
    assert_eq!(pastel.status, JobStatus::Degraded);
    assert_eq!(pastel.attempts, 4);
    assert!(pastel.matched_items.is_empty());
}

// ---------------------------------------------------------------------------
// Test: cancel stops polling and records the reason
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn cancel_stops_polling() {
    let h = harness(|_| ScriptedGateway::accepting());
    let request = styled("noir", 1, 60);
    let context_id = request.context_id.clone();
    h.registry.start(request).await.unwrap();

    tokio::time::sleep(Duration::from_secs(12)).await;
    let job = h.registry.cancel(&context_id).await.unwrap();

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.attempts, 2);
    assert_eq!(job.log.last().map(|e| e.message.as_str()), Some(CANCELLED_REASON));

    tokio::time::sleep(Duration::from_secs(60)).await;
    let after = h.registry.get(&context_id).await.unwrap();
    assert_eq!(after.attempts, 2);
    assert_eq!(h.registry.active_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn cancel_requires_an_active_job() {
    let h = harness(|_| ScriptedGateway::rejecting("bad brief"));
    let request = styled("noir", 1, 10);
    let context_id = request.context_id.clone();
    let _ = h.registry.start(request).await;

    assert_matches!(
        h.registry.cancel(&context_id).await,
        Err(TrackerError::NotActive(_))
    );
    assert_matches!(
        h.registry.cancel(&ContextId::new("missing")).await,
        Err(TrackerError::NotFound(_))
    );
}

// ---------------------------------------------------------------------------
// Test: a terminal context can be started again
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn terminal_context_can_restart() {
    let h = harness(|_| ScriptedGateway::accepting());
    let context_id = ContextId::styled_image(OWNER, "noir");
    h.registry.start(styled("noir", 1, 60)).await.unwrap();
    h.registry.cancel(&context_id).await.unwrap();

    let handle = h.registry.start(styled("noir", 2, 60)).await.unwrap();

    assert_eq!(handle.snapshot().status, JobStatus::Polling);
    assert_eq!(handle.snapshot().target_count, 2);
    assert_eq!(h.registry.list().await.len(), 1);
}

// ---------------------------------------------------------------------------
// Test: evict only removes terminal jobs
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn evict_rejects_active_and_removes_terminal() {
    let h = harness(|_| ScriptedGateway::accepting());
    let context_id = ContextId::styled_image(OWNER, "noir");
    h.registry.start(styled("noir", 1, 60)).await.unwrap();

    assert_matches!(
        h.registry.evict(&context_id).await,
        Err(TrackerError::RegistryConflict(_))
    );

    h.registry.cancel(&context_id).await.unwrap();
    let evicted = h.registry.evict(&context_id).await.unwrap();

    assert_eq!(evicted.status, JobStatus::Failed);
    assert!(h.registry.get(&context_id).await.is_none());
}

// ---------------------------------------------------------------------------
// Test: shutdown cancels everything and clears the registry
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_active_jobs() {
    let h = harness(|_| ScriptedGateway::accepting());
    let first = h.registry.start(styled("noir", 1, 60)).await.unwrap();
    let second = h.registry.start(styled("pastel", 1, 60)).await.unwrap();

    h.registry.shutdown().await;

    assert!(h.registry.list().await.is_empty());
    assert_eq!(first.snapshot().status, JobStatus::Failed);
    assert_eq!(second.snapshot().status, JobStatus::Failed);
}

#[tokio::test(start_paused = true)]
async fn start_after_shutdown_is_refused() {
    let h = harness(|_| ScriptedGateway::accepting());
    h.registry.shutdown().await;

    let result = h.registry.start(styled("noir", 1, 60)).await;

    assert_matches!(result, Err(TrackerError::ShuttingDown));
    assert!(h.registry.list().await.is_empty());
    assert!(h.gateway.requests().is_empty());
}

// ---------------------------------------------------------------------------
// Test: baseline failure falls back to zero and is logged
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn baseline_failure_is_logged_as_warning() {
    let h = harness(|_| ScriptedGateway::accepting());
    h.ledger.push(OWNER, ContentKind::StyledImage, Some("noir"));
    h.ledger.fail_next(1);

    let handle = h.registry.start(styled("noir", 1, 10)).await.unwrap();
    let job = handle.snapshot();

    assert_eq!(job.baseline_count, 0);
    assert_eq!(job.status, JobStatus::Polling);
    assert_eq!(job.log.at_level(LogLevel::Warning).count(), 1);
    assert_eq!(h.gateway.requests().len(), 1);
}

// ---------------------------------------------------------------------------
// Test: invalid requests never reach the provider
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn invalid_request_is_rejected_before_submission() {
    let h = harness(|_| ScriptedGateway::accepting());

    let result = h.registry.start(styled("noir", 0, 10)).await;

    assert_matches!(result, Err(TrackerError::Core(CoreError::Validation(_))));
    assert!(h.gateway.requests().is_empty());
    assert!(h.registry.list().await.is_empty());
}

// ---------------------------------------------------------------------------
// Test: lifecycle events are published
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn lifecycle_events_are_published() {
    let h = harness(|ledger| ScriptedGateway::accepting().fulfil_into(ledger));
    let mut rx = h.events.subscribe();

    let mut handle = h.registry.start(styled("noir", 1, 10)).await.unwrap();
    handle.wait().await;

    let submitted = rx.recv().await.unwrap();
    assert_eq!(submitted.event_type, EVENT_JOB_SUBMITTED);
    assert_eq!(submitted.payload["status"], "polling");

    let completed = rx.recv().await.unwrap();
    assert_eq!(completed.event_type, EVENT_JOB_COMPLETED);
    assert_eq!(completed.payload["progress"], 100);
    assert_eq!(completed.payload["matched"], 1);
    assert_eq!(completed.owner_id, Some(OWNER));
}

#[tokio::test(start_paused = true)]
async fn rejection_publishes_failed_event() {
    let h = harness(|_| ScriptedGateway::rejecting("quota exceeded"));
    let mut rx = h.events.subscribe();

    let _ = h.registry.start(styled("noir", 1, 10)).await;

    let event = rx.recv().await.unwrap();
    assert_eq!(event.event_type, EVENT_JOB_FAILED);
    assert_eq!(event.payload["status"], "failed");
}
