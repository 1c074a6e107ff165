//! Pre-submission baseline capture.

use std::sync::Arc;

use persona_core::content::TargetPredicate;

use crate::ledger::ContentLedger;

/// Count of matching items observed before submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Baseline {
    pub count: usize,
    /// Set when the ledger query failed and `count` fell back to zero.
    pub fallback_reason: Option<String>,
}

/// Records how many items already satisfy a job's predicate.
///
/// Must run before the request is sent; a provider that finishes before
/// the baseline is read would otherwise have its output counted as
/// pre-existing.
#[derive(Clone)]
pub struct BaselineSnapshotter {
    ledger: Arc<dyn ContentLedger>,
}

impl BaselineSnapshotter {
    pub fn new(ledger: Arc<dyn ContentLedger>) -> Self {
        Self { ledger }
    }

    /// Count matching items. A failed query yields zero so that
    /// submission is never blocked.
    pub async fn capture(&self, predicate: &TargetPredicate) -> Baseline {
        match self.ledger.count_matching(predicate).await {
            Ok(count) => Baseline {
                count,
                fallback_reason: None,
            },
            Err(e) => {
                tracing::warn!(
                    owner_id = predicate.owner_id,
                    kind = %predicate.kind,
                    error = %e,
                    "Baseline capture failed, assuming zero existing items",
                );
                Baseline {
                    count: 0,
                    fallback_reason: Some(e.to_string()),
                }
            }
        }
    }
}
