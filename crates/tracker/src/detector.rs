//! Per-tick completion detection against the content ledger.

use std::sync::Arc;

use persona_core::content::ContentItem;
use persona_core::detection::select_new_matches;
use persona_core::job::GenerationJob;

use crate::ledger::{filter_for, ContentLedger};

/// What one ledger check observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// The newest `current_count - baseline` matching items, newest first.
    pub new_matches: Vec<ContentItem>,
    pub current_count: usize,
    /// Set when the query failed; the tick is then a no-op.
    pub query_error: Option<String>,
}

/// Re-lists the ledger and diffs it against a job's baseline.
#[derive(Clone)]
pub struct CompletionDetector {
    ledger: Arc<dyn ContentLedger>,
}

impl CompletionDetector {
    pub fn new(ledger: Arc<dyn ContentLedger>) -> Self {
        Self { ledger }
    }

    /// Check the ledger for items produced since `job` was submitted.
    ///
    /// A failed query returns no matches and `current_count ==
    /// baseline_count`.
    pub async fn check(&self, job: &GenerationJob) -> Detection {
        let predicate = &job.target_predicate;
        let listing = self
            .ledger
            .list_for_owner(predicate.owner_id, &filter_for(predicate))
            .await;

        match listing {
            Ok(items) => {
                let delta = select_new_matches(&items, predicate, job.baseline_count);
                tracing::trace!(
                    context_id = %job.context_id,
                    current_count = delta.current_count,
                    baseline = job.baseline_count,
                    "Ledger checked",
                );
                Detection {
                    new_matches: delta.new_matches,
                    current_count: delta.current_count,
                    query_error: None,
                }
            }
            Err(e) => {
                tracing::warn!(
                    context_id = %job.context_id,
                    attempt = job.attempts + 1,
                    error = %e,
                    "Ledger query failed during poll",
                );
                Detection {
                    new_matches: Vec::new(),
                    current_count: job.baseline_count,
                    query_error: Some(e.to_string()),
                }
            }
        }
    }
}
