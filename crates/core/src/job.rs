//! The tracked unit of generation work and its lifecycle.
//!
//! ```text
//! Idle -> Submitting -> Polling -> Completed | Degraded | Failed
//!              \-> Failed   (gateway rejection, before any tick)
//! ```
//!
//! Once a job is terminal every field is frozen; transition methods on a
//! terminal job return [`CoreError::Conflict`].

use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::content::{ContentItem, ContentKind, TargetPredicate};
use crate::context::ContextId;
use crate::error::CoreError;
use crate::event_log::EventLog;
use crate::polling::default_max_attempts;
use crate::progress::{PROGRESS_DONE, PROGRESS_SUBMITTED};
use crate::types::{DbId, Timestamp};

/// Maximum number of items a single job may wait for.
pub const MAX_TARGET_COUNT: u32 = 50;
/// Maximum length of a context id.
pub const MAX_CONTEXT_ID_LEN: usize = 200;

/// Reason recorded when a caller cancels a job.
pub const CANCELLED_REASON: &str = "cancelled by caller";
/// Reason recorded when the submitting caller went away before the
/// provider answered.
pub const ABANDONED_REASON: &str = "submission abandoned before the provider answered";

// ---------------------------------------------------------------------------
// JobStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Idle,
    Submitting,
    Polling,
    Completed,
    /// Attempt budget ran out; the provider may still finish.
    Degraded,
    Failed,
}

impl JobStatus {
    /// `Submitting` and `Polling` hold the context id.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Submitting | Self::Polling)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Degraded | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Submitting => "submitting",
            Self::Polling => "polling",
            Self::Completed => "completed",
            Self::Degraded => "degraded",
            Self::Failed => "failed",
        }
    }

    /// Whether the state machine allows `self -> to`.
    pub fn can_transition_to(self, to: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, to),
            (Idle, Submitting)
                | (Submitting, Polling)
                | (Submitting, Failed)
                | (Polling, Completed)
                | (Polling, Degraded)
                | (Polling, Failed)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// StartJob
// ---------------------------------------------------------------------------

/// Request to start tracking a generation job.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StartJob {
    #[validate(custom(function = "validate_context_id"))]
    pub context_id: ContextId,
    pub owner_id: DbId,
    pub kind: ContentKind,
    #[validate(length(min = 1, max = 64))]
    #[serde(default)]
    pub style: Option<String>,
    #[validate(range(min = 1, max = 50))]
    pub target_count: u32,
    /// Overrides the per-kind default attempt budget.
    #[validate(range(min = 1, max = 1000))]
    #[serde(default)]
    pub max_attempts: Option<u32>,
    /// Free-form attributes describing what to render; forwarded to the
    /// provider untouched.
    #[serde(default)]
    pub brief: serde_json::Value,
}

impl StartJob {
    pub fn predicate(&self) -> TargetPredicate {
        TargetPredicate {
            owner_id: self.owner_id,
            kind: self.kind,
            style: self.style.as_ref().map(|s| s.trim().to_string()),
        }
    }

    /// Attempt budget for this job.
    pub fn effective_max_attempts(&self) -> u32 {
        self.max_attempts
            .unwrap_or_else(|| default_max_attempts(self.kind))
    }

    /// Validate field ranges, mapping failures to [`CoreError::Validation`].
    pub fn check(&self) -> Result<(), CoreError> {
        self.validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        if self.style.as_deref().is_some_and(|s| s.trim().is_empty()) {
            return Err(CoreError::Validation(
                "style must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_context_id(id: &ContextId) -> Result<(), ValidationError> {
    let s = id.as_str();
    if s.trim().is_empty() || s.len() > MAX_CONTEXT_ID_LEN {
        return Err(ValidationError::new("context_id_length"));
    }
    // Ids are addressed as a single URL path segment.
    if s.chars().any(|c| c == '/' || c.is_control()) {
        return Err(ValidationError::new("context_id_charset"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// GenerationJob
// ---------------------------------------------------------------------------

/// A tracked generation job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationJob {
    pub context_id: ContextId,
    pub target_predicate: TargetPredicate,
    pub target_count: u32,
    pub baseline_count: usize,
    pub submitted_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
    pub attempts: u32,
    pub max_attempts: u32,
    pub progress: u8,
    pub status: JobStatus,
    pub log: EventLog,
    pub matched_items: Vec<ContentItem>,
    /// Matching items seen beyond `target_count` (highest count observed).
    pub surplus_count: usize,
    /// Identifier handed back by the provider on acceptance, if any.
    pub provider_ref: Option<String>,
}

impl GenerationJob {
    /// Create an `Idle` job from a validated start request.
    pub fn new(start: &StartJob) -> Self {
        Self {
            context_id: start.context_id.clone(),
            target_predicate: start.predicate(),
            target_count: start.target_count,
            baseline_count: 0,
            submitted_at: None,
            finished_at: None,
            attempts: 0,
            max_attempts: start.effective_max_attempts(),
            progress: 0,
            status: JobStatus::Idle,
            log: EventLog::new(),
            matched_items: Vec::new(),
            surplus_count: 0,
            provider_ref: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// `Idle -> Submitting`.
    pub fn begin_submission(&mut self) -> Result<(), CoreError> {
        self.transition(JobStatus::Submitting)?;
        self.log.info(format!(
            "Requesting {} {} item(s)",
            self.target_count, self.target_predicate.kind
        ));
        Ok(())
    }

    /// Record the pre-submission ledger count. Only allowed while
    /// `Submitting`, so the baseline cannot be recomputed later.
    pub fn record_baseline(&mut self, count: usize) -> Result<(), CoreError> {
        if self.status != JobStatus::Submitting {
            return Err(CoreError::Conflict(format!(
                "baseline for '{}' can only be captured while submitting",
                self.context_id
            )));
        }
        self.baseline_count = count;
        Ok(())
    }

    /// Stamp the dispatch time, right before the request goes out.
    pub fn mark_dispatched(&mut self) -> Result<(), CoreError> {
        if self.status != JobStatus::Submitting {
            return Err(CoreError::Conflict(format!(
                "job '{}' can only be dispatched while submitting",
                self.context_id
            )));
        }
        self.submitted_at = Some(Utc::now());
        Ok(())
    }

    /// `Submitting -> Polling` after the provider accepted the request.
    pub fn mark_accepted(&mut self, provider_ref: Option<String>) -> Result<(), CoreError> {
        self.transition(JobStatus::Polling)?;
        self.provider_ref = provider_ref;
        self.progress = PROGRESS_SUBMITTED;
        self.log.info("Request accepted, waiting for results");
        Ok(())
    }

    /// `Submitting -> Failed`; `message` is logged verbatim.
    pub fn mark_rejected(&mut self, message: &str) -> Result<(), CoreError> {
        self.transition(JobStatus::Failed)?;
        self.finished_at = Some(Utc::now());
        self.log.error(message);
        Ok(())
    }

    /// `Polling -> Completed`, forcing progress to 100.
    pub fn complete(&mut self) -> Result<(), CoreError> {
        self.transition(JobStatus::Completed)?;
        self.finished_at = Some(Utc::now());
        self.progress = PROGRESS_DONE;
        self.log.success(format!(
            "Generation complete: {}/{} item(s) found",
            self.matched_items.len(),
            self.target_count
        ));
        Ok(())
    }

    /// `Polling -> Degraded`, leaving progress at its last value.
    pub fn degrade(&mut self) -> Result<(), CoreError> {
        self.transition(JobStatus::Degraded)?;
        self.finished_at = Some(Utc::now());
        self.log.warning(format!(
            "Stopped checking after {} attempts with {}/{} item(s); \
             the provider may still be working, check back later",
            self.attempts,
            self.matched_items.len(),
            self.target_count
        ));
        Ok(())
    }

    /// Active -> `Failed` on caller request.
    pub fn cancel(&mut self) -> Result<(), CoreError> {
        self.transition(JobStatus::Failed)?;
        self.finished_at = Some(Utc::now());
        self.log.error(CANCELLED_REASON);
        Ok(())
    }

    /// `Submitting -> Failed` when nobody is left to finish the submission.
    pub fn abandon(&mut self) -> Result<(), CoreError> {
        if self.status != JobStatus::Submitting {
            return Err(CoreError::Conflict(format!(
                "job '{}' is not submitting",
                self.context_id
            )));
        }
        self.transition(JobStatus::Failed)?;
        self.finished_at = Some(Utc::now());
        self.log.error(ABANDONED_REASON);
        Ok(())
    }

    fn transition(&mut self, to: JobStatus) -> Result<(), CoreError> {
        if !self.status.can_transition_to(to) {
            return Err(CoreError::Conflict(format!(
                "job '{}' cannot move from {} to {}",
                self.context_id, self.status, to
            )));
        }
        self.status = to;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
