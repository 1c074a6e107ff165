//! Registry of generation jobs, one per context id.
//!
//! Each accepted job runs its own polling task with a child of the
//! registry's cancellation token. Job state lives in a `watch` channel so
//! callers can snapshot or await it through a [`JobHandle`] without
//! touching the registry lock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use persona_core::context::ContextId;
use persona_core::job::{GenerationJob, StartJob};
use persona_core::job_events::{EVENT_JOB_FAILED, EVENT_JOB_SUBMITTED};
use persona_core::polling::PollingPolicy;
use persona_events::EventBus;
use persona_provider::GenerationRequest;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::detector::CompletionDetector;
use crate::error::TrackerError;
use crate::gateway::{Acknowledgement, SubmissionGateway};
use crate::ledger::ContentLedger;
use crate::scheduler::{commit, job_event, PollingScheduler};
use crate::snapshot::BaselineSnapshotter;

/// How long to wait for a polling task to notice cancellation.
const TASK_STOP_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// JobHandle
// ---------------------------------------------------------------------------

/// Read-only view of one job's state.
#[derive(Debug, Clone)]
pub struct JobHandle {
    context_id: ContextId,
    rx: watch::Receiver<GenerationJob>,
}

impl JobHandle {
    pub fn context_id(&self) -> &ContextId {
        &self.context_id
    }

    /// Current state of the job.
    pub fn snapshot(&self) -> GenerationJob {
        self.rx.borrow().clone()
    }

    /// Resolve once the job is terminal.
    ///
    /// If the job is dropped from the registry first, the last observed
    /// state is returned.
    pub async fn wait(&mut self) -> GenerationJob {
        let terminal = self
            .rx
            .wait_for(GenerationJob::is_terminal)
            .await
            .map(|job| GenerationJob::clone(&job));
        terminal.unwrap_or_else(|_| self.rx.borrow().clone())
    }
}

// ---------------------------------------------------------------------------
// JobRegistry
// ---------------------------------------------------------------------------

struct ManagedJob {
    state: Arc<watch::Sender<GenerationJob>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ManagedJob {
    fn handle(&self, context_id: &ContextId) -> JobHandle {
        JobHandle {
            context_id: context_id.clone(),
            rx: self.state.subscribe(),
        }
    }

    fn is_active(&self) -> bool {
        self.state.borrow().is_active()
    }
}

/// Starts, tracks and cancels generation jobs.
///
/// At most one job per context id is active at a time. Terminal jobs stay
/// in the registry (so their log can be read) until evicted or replaced
/// by a new start for the same context.
pub struct JobRegistry {
    snapshotter: BaselineSnapshotter,
    gateway: Arc<dyn SubmissionGateway>,
    scheduler: Arc<PollingScheduler>,
    events: Arc<EventBus>,
    jobs: RwLock<HashMap<ContextId, ManagedJob>>,
    cancel: CancellationToken,
}

impl JobRegistry {
    pub fn new(
        ledger: Arc<dyn ContentLedger>,
        gateway: Arc<dyn SubmissionGateway>,
        policy: PollingPolicy,
        events: Arc<EventBus>,
    ) -> Self {
        let scheduler = PollingScheduler::new(
            CompletionDetector::new(Arc::clone(&ledger)),
            policy,
            Arc::clone(&events),
        );
        Self {
            snapshotter: BaselineSnapshotter::new(ledger),
            gateway,
            scheduler: Arc::new(scheduler),
            events,
            jobs: RwLock::new(HashMap::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// Start a job for `request.context_id`.
    ///
    /// Captures the baseline, submits the request and, once accepted,
    /// spawns the polling task. Returns [`TrackerError::RegistryConflict`]
    /// if the context already has an active job and
    /// [`TrackerError::SubmissionRejected`] if the provider refused; the
    /// rejected job stays in the registry as `Failed`. If the returned
    /// future is dropped before the provider answers, the job is failed as
    /// abandoned and the context is free again.
    pub async fn start(&self, request: StartJob) -> Result<JobHandle, TrackerError> {
        request.check()?;

        let mut job = GenerationJob::new(&request);
        job.begin_submission()?;
        let context_id = job.context_id.clone();
        let (tx, _) = watch::channel(job.clone());
        let state = Arc::new(tx);
        let cancel = self.cancel.child_token();

        let handle = {
            let mut jobs = self.jobs.write().await;
            if self.cancel.is_cancelled() {
                return Err(TrackerError::ShuttingDown);
            }
            if jobs.get(&context_id).is_some_and(ManagedJob::is_active) {
                tracing::warn!(context_id = %context_id, "Start rejected, context busy");
                return Err(TrackerError::RegistryConflict(context_id));
            }
            let managed = ManagedJob {
                state: Arc::clone(&state),
                cancel: cancel.clone(),
                task: None,
            };
            let handle = managed.handle(&context_id);
            jobs.insert(context_id.clone(), managed);
            handle
        };

        // From here on the caller may drop this future at any await.
        let _guard = SubmissionGuard {
            state: &state,
            events: &self.events,
        };

        // The baseline must be read before the provider sees the request.
        let baseline = self.snapshotter.capture(&job.target_predicate).await;
        job.record_baseline(baseline.count)?;
        if let Some(reason) = baseline.fallback_reason {
            job.log.warning(format!(
                "Could not count existing items ({reason}), assuming none"
            ));
        }
        job.mark_dispatched()?;
        if !commit(&state, &job) {
            tracing::info!(context_id = %context_id, "Job cancelled before submission");
            return Ok(handle);
        }

        let ack = self.gateway.send(&GenerationRequest::from(&request)).await;

        match ack {
            Acknowledgement::Rejected { message } => {
                job.mark_rejected(&message)?;
                if commit(&state, &job) {
                    self.events.publish(job_event(EVENT_JOB_FAILED, &job));
                }
                tracing::error!(
                    context_id = %context_id,
                    error = %message,
                    "Generation request rejected",
                );
                Err(TrackerError::SubmissionRejected {
                    context_id,
                    message,
                })
            }
            Acknowledgement::Accepted { provider_ref } => {
                job.mark_accepted(provider_ref)?;
                if !commit(&state, &job) {
                    tracing::info!(context_id = %context_id, "Job cancelled during submission");
                    return Ok(handle);
                }
                self.events.publish(job_event(EVENT_JOB_SUBMITTED, &job));
                tracing::info!(
                    context_id = %context_id,
                    baseline = job.baseline_count,
                    target = job.target_count,
                    max_attempts = job.max_attempts,
                    "Generation request accepted",
                );

                let scheduler = Arc::clone(&self.scheduler);
                let task_state = Arc::clone(&state);
                let task_cancel = cancel.clone();
                let task = tokio::spawn(async move {
                    scheduler.run(task_state, task_cancel).await;
                });

                // If the job was cancelled and evicted meanwhile, the task
                // sees the cancelled token and exits on its own.
                let mut jobs = self.jobs.write().await;
                if let Some(managed) = jobs
                    .get_mut(&context_id)
                    .filter(|m| Arc::ptr_eq(&m.state, &state))
                {
                    managed.task = Some(task);
                }
                Ok(handle)
            }
        }
    }

    /// Snapshot of the job for `context_id`, if tracked.
    pub async fn get(&self, context_id: &ContextId) -> Option<GenerationJob> {
        let jobs = self.jobs.read().await;
        jobs.get(context_id).map(|m| m.state.borrow().clone())
    }

    /// Snapshots of every tracked job, ordered by context id.
    pub async fn list(&self) -> Vec<GenerationJob> {
        let jobs = self.jobs.read().await;
        let mut list: Vec<GenerationJob> =
            jobs.values().map(|m| m.state.borrow().clone()).collect();
        list.sort_by(|a, b| a.context_id.as_str().cmp(b.context_id.as_str()));
        list
    }

    pub async fn active_count(&self) -> usize {
        let jobs = self.jobs.read().await;
        jobs.values().filter(|m| m.is_active()).count()
    }

    /// Stop polling and mark the job `Failed`.
    ///
    /// Best effort: the provider request is not retracted. If the job
    /// finished while the polling task was being stopped, its terminal
    /// state is kept and returned.
    pub async fn cancel(&self, context_id: &ContextId) -> Result<GenerationJob, TrackerError> {
        let (state, token, task) = {
            let mut jobs = self.jobs.write().await;
            let managed = jobs
                .get_mut(context_id)
                .ok_or_else(|| TrackerError::NotFound(context_id.clone()))?;
            if !managed.is_active() {
                return Err(TrackerError::NotActive(context_id.clone()));
            }
            (
                Arc::clone(&managed.state),
                managed.cancel.clone(),
                managed.task.take(),
            )
        };

        token.cancel();
        if let Some(task) = task {
            stop_task(context_id, task).await;
        }

        if mark_cancelled(&state) {
            let job = state.borrow().clone();
            self.events.publish(job_event(EVENT_JOB_FAILED, &job));
            tracing::info!(context_id = %context_id, attempts = job.attempts, "Job cancelled");
        }
        let job = state.borrow().clone();
        Ok(job)
    }

    /// Remove a terminal job. Active jobs must be cancelled first.
    pub async fn evict(&self, context_id: &ContextId) -> Result<GenerationJob, TrackerError> {
        let mut jobs = self.jobs.write().await;
        let managed = jobs
            .get(context_id)
            .ok_or_else(|| TrackerError::NotFound(context_id.clone()))?;
        if managed.is_active() {
            return Err(TrackerError::RegistryConflict(context_id.clone()));
        }
        let job = managed.state.borrow().clone();
        jobs.remove(context_id);
        tracing::debug!(context_id = %context_id, "Job evicted");
        Ok(job)
    }

    /// Cancel every active job, wait for the polling tasks and clear the
    /// registry.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down job registry");
        self.cancel.cancel();

        let drained: Vec<(ContextId, ManagedJob)> = {
            let mut jobs = self.jobs.write().await;
            jobs.drain().collect()
        };

        for (context_id, managed) in drained {
            managed.cancel.cancel();
            if let Some(task) = managed.task {
                stop_task(&context_id, task).await;
            }
            if mark_cancelled(&managed.state) {
                let job = managed.state.borrow().clone();
                self.events.publish(job_event(EVENT_JOB_FAILED, &job));
            }
        }

        tracing::info!("Job registry shut down complete");
    }
}

/// Fails the stored job if `start` is dropped while it is still
/// `Submitting`.
struct SubmissionGuard<'a> {
    state: &'a watch::Sender<GenerationJob>,
    events: &'a EventBus,
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        if self.state.send_if_modified(|job| job.abandon().is_ok()) {
            let job = self.state.borrow().clone();
            tracing::warn!(context_id = %job.context_id, "Submission abandoned");
            self.events.publish(job_event(EVENT_JOB_FAILED, &job));
        }
    }
}

/// Cancel the stored job if it is still active.
fn mark_cancelled(state: &watch::Sender<GenerationJob>) -> bool {
    state.send_if_modified(|job| job.is_active() && job.cancel().is_ok())
}

async fn stop_task(context_id: &ContextId, mut task: JoinHandle<()>) {
    if tokio::time::timeout(TASK_STOP_TIMEOUT, &mut task).await.is_err() {
        tracing::warn!(context_id = %context_id, "Polling task did not stop in time, aborting");
        task.abort();
    }
}
