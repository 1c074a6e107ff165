//! Per-job polling loop.
//!
//! One [`PollingScheduler::run`] task drives a single job: sleep, check
//! the ledger, fold the result into the job, publish, repeat. Ticks for a
//! job are strictly sequential; the next sleep only starts once the
//! previous check has resolved.

use std::sync::Arc;

use persona_core::detection::fold_matches;
use persona_core::error::CoreError;
use persona_core::job::{GenerationJob, JobStatus};
use persona_core::job_events::{
    EVENT_JOB_COMPLETED, EVENT_JOB_DEGRADED, EVENT_JOB_PROGRESS,
};
use persona_core::polling::{evaluate_tick, next_delay, PollingPolicy, TickDecision};
use persona_core::progress::{advance_progress, estimate_progress};
use persona_events::{EventBus, PlatformEvent};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::detector::{CompletionDetector, Detection};

/// Drives polling ticks for accepted jobs.
pub struct PollingScheduler {
    detector: CompletionDetector,
    policy: PollingPolicy,
    events: Arc<EventBus>,
}

impl PollingScheduler {
    pub fn new(detector: CompletionDetector, policy: PollingPolicy, events: Arc<EventBus>) -> Self {
        Self {
            detector,
            policy,
            events,
        }
    }

    /// Run one tick against `job` in place.
    pub async fn tick(&self, job: &mut GenerationJob) -> Result<TickDecision, CoreError> {
        let detection = self.detector.check(job).await;
        apply_tick(job, &detection, &self.policy)
    }

    /// Poll until the job is terminal or `cancel` fires.
    ///
    /// Works on a private copy of the job and publishes each tick's result
    /// into `state`. If the stored job has meanwhile stopped being active
    /// (cancelled by the registry), the loop exits without overwriting it.
    pub async fn run(&self, state: Arc<watch::Sender<GenerationJob>>, cancel: CancellationToken) {
        let mut job = state.borrow().clone();
        let mut delay = self.policy.interval;

        tracing::info!(
            context_id = %job.context_id,
            max_attempts = job.max_attempts,
            baseline = job.baseline_count,
            interval_ms = delay.as_millis() as u64,
            "Polling started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(context_id = %job.context_id, "Polling cancelled");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            let detection = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(context_id = %job.context_id, "Polling cancelled mid-check");
                    return;
                }
                detection = self.detector.check(&job) => detection,
            };

            let previous_progress = job.progress;
            let decision = match apply_tick(&mut job, &detection, &self.policy) {
                Ok(decision) => decision,
                Err(e) => {
                    tracing::error!(context_id = %job.context_id, error = %e, "Tick rejected");
                    return;
                }
            };

            if !commit(&state, &job) {
                tracing::debug!(context_id = %job.context_id, "Job no longer active, stopping");
                return;
            }

            match decision {
                TickDecision::Complete => {
                    tracing::info!(
                        context_id = %job.context_id,
                        attempts = job.attempts,
                        matched = job.matched_items.len(),
                        "Generation job completed",
                    );
                    self.events.publish(job_event(EVENT_JOB_COMPLETED, &job));
                    return;
                }
                TickDecision::Exhausted => {
                    tracing::info!(
                        context_id = %job.context_id,
                        attempts = job.attempts,
                        matched = job.matched_items.len(),
                        target = job.target_count,
                        "Attempt budget exhausted, job degraded",
                    );
                    self.events.publish(job_event(EVENT_JOB_DEGRADED, &job));
                    return;
                }
                TickDecision::Continue => {
                    if job.progress != previous_progress {
                        self.events.publish(job_event(EVENT_JOB_PROGRESS, &job));
                    }
                }
            }

            delay = next_delay(delay, &self.policy);
        }
    }
}

/// Fold one tick's detection into `job`.
///
/// Increments `attempts` even when the query failed, updates progress
/// monotonically and finalizes the job when the stop rule fires. Log
/// entries are only written when something changed, or on every
/// `log_every`-th quiet tick.
pub fn apply_tick(
    job: &mut GenerationJob,
    detection: &Detection,
    policy: &PollingPolicy,
) -> Result<TickDecision, CoreError> {
    if job.status != JobStatus::Polling {
        return Err(CoreError::Conflict(format!(
            "job '{}' is {} and cannot be polled",
            job.context_id, job.status
        )));
    }

    job.attempts += 1;
    let attempt = job.attempts;
    let mut noted = false;

    match &detection.query_error {
        Some(error) => {
            job.log.warning(format!(
                "Check {attempt}/{}: could not read content ({error}), will retry",
                job.max_attempts
            ));
            noted = true;
        }
        None => {
            let fold = fold_matches(&mut job.matched_items, &detection.new_matches, job.target_count);
            if fold.added > 0 {
                job.log.info(format!(
                    "Check {attempt}/{}: {} new item(s), {}/{} found",
                    job.max_attempts,
                    fold.added,
                    job.matched_items.len(),
                    job.target_count
                ));
                noted = true;
            }
            if fold.surplus > job.surplus_count {
                job.surplus_count = fold.surplus;
                job.log.warning(format!(
                    "{} item(s) beyond the requested {} were produced and ignored",
                    fold.surplus, job.target_count
                ));
                noted = true;
            }
        }
    }

    let estimate = estimate_progress(
        job.attempts,
        job.max_attempts,
        job.matched_items.len(),
        job.target_count,
    );
    job.progress = advance_progress(job.progress, estimate);

    let decision = evaluate_tick(
        job.matched_items.len(),
        job.target_count,
        job.attempts,
        job.max_attempts,
    );
    match decision {
        TickDecision::Complete => job.complete()?,
        TickDecision::Exhausted => job.degrade()?,
        TickDecision::Continue if !noted && policy.is_log_tick(attempt) => {
            job.log.info(format!(
                "Check {attempt}/{}: {}/{} found, still waiting",
                job.max_attempts,
                job.matched_items.len(),
                job.target_count
            ));
        }
        TickDecision::Continue => {}
    }

    Ok(decision)
}

/// Store `job` as the current state unless the stored job has already
/// left the active states. Returns whether the state was written.
pub(crate) fn commit(state: &watch::Sender<GenerationJob>, job: &GenerationJob) -> bool {
    state.send_if_modified(|current| {
        if current.is_active() {
            *current = job.clone();
            true
        } else {
            false
        }
    })
}

/// Lifecycle event for `job`.
pub(crate) fn job_event(event_type: &str, job: &GenerationJob) -> PlatformEvent {
    PlatformEvent::new(event_type)
        .with_context(job.context_id.clone())
        .with_owner(job.target_predicate.owner_id)
        .with_payload(serde_json::json!({
            "context_id": job.context_id,
            "status": job.status,
            "progress": job.progress,
            "attempts": job.attempts,
            "matched": job.matched_items.len(),
        }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
