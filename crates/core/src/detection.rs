//! Baseline/diff completion detection.
//!
//! The provider never reports which ledger item a request produced. A job
//! instead records how many matching items existed before submission and,
//! on every tick, treats the newest `current - baseline` matching items as
//! its output.

use std::cmp::Ordering;

use crate::content::{ContentItem, TargetPredicate};

/// Order two items newest-first; equal timestamps fall back to the higher
/// id.
pub fn recency_order(a: &ContentItem, b: &ContentItem) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

/// Count the items in `items` that satisfy `predicate`.
pub fn count_matching(items: &[ContentItem], predicate: &TargetPredicate) -> usize {
    items.iter().filter(|i| predicate.matches(i)).count()
}

/// Result of diffing a ledger listing against a job's baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta {
    /// Newest-first items beyond the baseline.
    pub new_matches: Vec<ContentItem>,
    /// Number of matching items currently in the ledger.
    pub current_count: usize,
}

/// Select the items that appeared after `baseline_count`.
///
/// Non-matching items are ignored. When `current_count <= baseline_count`
/// nothing is selected; otherwise the `delta` most recent matching items
/// are returned in descending recency order.
pub fn select_new_matches(
    items: &[ContentItem],
    predicate: &TargetPredicate,
    baseline_count: usize,
) -> Delta {
    let mut matching: Vec<ContentItem> = items
        .iter()
        .filter(|i| predicate.matches(i))
        .cloned()
        .collect();
    let current_count = matching.len();
    let delta = current_count.saturating_sub(baseline_count);

    matching.sort_by(recency_order);
    matching.truncate(delta);

    Delta {
        new_matches: matching,
        current_count,
    }
}

/// Outcome of folding a tick's new matches into a job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Fold {
    /// Items appended to `matched` on this tick.
    pub added: usize,
    /// New items that did not fit under `target_count`.
    pub surplus: usize,
}

/// Append unseen `new_matches` to `matched`, never letting it grow past
/// `target_count`.
///
/// Items already present (by id) are skipped; the rest are appended in
/// the order given until the cap is reached and counted as surplus after.
pub fn fold_matches(
    matched: &mut Vec<ContentItem>,
    new_matches: &[ContentItem],
    target_count: u32,
) -> Fold {
    let cap = target_count as usize;
    let mut fold = Fold::default();

    for item in new_matches {
        if matched.iter().any(|m| m.id == item.id) {
            continue;
        }
        if matched.len() < cap {
            matched.push(item.clone());
            fold.added += 1;
        } else {
            fold.surplus += 1;
        }
    }

    fold
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
