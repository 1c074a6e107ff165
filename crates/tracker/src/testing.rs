//! In-memory doubles for the ledger and provider.
//!
//! Used by this crate's tests and by `persona-api`'s integration tests to
//! drive jobs without Postgres or a live provider.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::DateTime;
use persona_core::content::{ContentItem, ContentKind, TargetPredicate};
use persona_core::detection::recency_order;
use persona_core::types::DbId;
use persona_db::models::content::{ContentFilter, CreateContent};
use persona_provider::GenerationRequest;

use crate::gateway::{Acknowledgement, SubmissionGateway};
use crate::ledger::{ContentLedger, LedgerError};

/// Creation time of item id 0; each later id is one second newer.
const EPOCH_SECS: i64 = 1_767_225_600;

// ---------------------------------------------------------------------------
// InMemoryLedger
// ---------------------------------------------------------------------------

#[derive(Default)]
struct LedgerState {
    items: Vec<ContentItem>,
    next_id: DbId,
    list_calls: usize,
    fail_next: usize,
    failing_lists: Vec<usize>,
    reveals: Vec<(usize, ContentItem)>,
    unavailable: bool,
}

impl LedgerState {
    fn allocate(&mut self, owner_id: DbId, kind: ContentKind, style: Option<&str>) -> ContentItem {
        self.next_id += 1;
        let id = self.next_id;
        ContentItem {
            id,
            owner_id,
            kind,
            style: style.map(str::to_string),
            created_at: DateTime::from_timestamp(EPOCH_SECS + id, 0).unwrap_or_default(),
            url: format!("memory://content/{id}"),
        }
    }

    fn check_available(&mut self) -> Result<(), LedgerError> {
        if self.unavailable {
            return Err(LedgerError::Unavailable("ledger offline".into()));
        }
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(LedgerError::Unavailable("injected failure".into()));
        }
        Ok(())
    }
}

/// Ledger held in memory.
///
/// Items get increasing ids and creation times. Failures and delayed
/// items can be scripted against the number of `list_for_owner` calls,
/// which equals the number of polling ticks a job has run (baseline
/// capture goes through `count_matching` and is not counted).
#[derive(Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an item immediately.
    pub fn push(&self, owner_id: DbId, kind: ContentKind, style: Option<&str>) -> ContentItem {
        let mut state = self.lock();
        let item = state.allocate(owner_id, kind, style);
        state.items.push(item.clone());
        item
    }

    /// Make an item appear just before the `list_call`-th listing.
    pub fn reveal_on_list(
        &self,
        list_call: usize,
        owner_id: DbId,
        kind: ContentKind,
        style: Option<&str>,
    ) {
        let mut state = self.lock();
        // Ids are allocated on reveal so creation order follows visibility.
        let placeholder = ContentItem {
            id: 0,
            owner_id,
            kind,
            style: style.map(str::to_string),
            created_at: DateTime::from_timestamp(EPOCH_SECS, 0).unwrap_or_default(),
            url: String::new(),
        };
        state.reveals.push((list_call, placeholder));
    }

    /// Fail the next `n` reads of any kind.
    pub fn fail_next(&self, n: usize) {
        self.lock().fail_next = n;
    }

    /// Fail the `list_call`-th listing (1-based).
    pub fn fail_on_list(&self, list_call: usize) {
        self.lock().failing_lists.push(list_call);
    }

    /// Fail every read until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    pub fn list_calls(&self) -> usize {
        self.lock().list_calls
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn filter_matches(owner_id: DbId, filter: &ContentFilter, item: &ContentItem) -> bool {
    let predicate = TargetPredicate {
        owner_id,
        kind: filter.kind.unwrap_or(item.kind),
        style: filter.style.clone(),
    };
    predicate.matches(item)
}

#[async_trait]
impl ContentLedger for InMemoryLedger {
    async fn list_for_owner(
        &self,
        owner_id: DbId,
        filter: &ContentFilter,
    ) -> Result<Vec<ContentItem>, LedgerError> {
        let mut state = self.lock();
        state.list_calls += 1;
        let call = state.list_calls;

        let due: Vec<ContentItem> = {
            let (due, pending) = std::mem::take(&mut state.reveals)
                .into_iter()
                .partition::<Vec<_>, _>(|(at, _)| *at <= call);
            state.reveals = pending;
            due.into_iter().map(|(_, item)| item).collect()
        };
        for item in due {
            let revealed = state.allocate(item.owner_id, item.kind, item.style.as_deref());
            state.items.push(revealed);
        }

        if state.failing_lists.contains(&call) {
            return Err(LedgerError::Unavailable(format!("injected failure on list {call}")));
        }
        state.check_available()?;

        let mut items: Vec<ContentItem> = state
            .items
            .iter()
            .filter(|i| filter_matches(owner_id, filter, i))
            .cloned()
            .collect();
        items.sort_by(recency_order);
        Ok(items)
    }

    async fn count_matching(&self, predicate: &TargetPredicate) -> Result<usize, LedgerError> {
        let mut state = self.lock();
        state.check_available()?;
        Ok(state.items.iter().filter(|i| predicate.matches(i)).count())
    }

    async fn create(&self, input: &CreateContent) -> Result<ContentItem, LedgerError> {
        let mut state = self.lock();
        state.check_available()?;
        let mut item = state.allocate(input.owner_id, input.kind, input.style.as_deref());
        item.url = input.url.clone();
        state.items.push(item.clone());
        Ok(item)
    }

    async fn delete(&self, id: DbId) -> Result<bool, LedgerError> {
        let mut state = self.lock();
        state.check_available()?;
        let before = state.items.len();
        state.items.retain(|i| i.id != id);
        Ok(state.items.len() < before)
    }

    async fn ping(&self) -> Result<(), LedgerError> {
        if self.lock().unavailable {
            return Err(LedgerError::Unavailable("ledger offline".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ScriptedGateway
// ---------------------------------------------------------------------------

/// Provider double that answers from a script and records requests.
///
/// Queued answers are used first, then the default. With
/// [`fulfil_into`](Self::fulfil_into) an accepted request immediately
/// writes its items to a ledger, as a provider that finishes before the
/// acknowledgement returns would. [`stall_next`](Self::stall_next) makes
/// requests hang without ever answering.
pub struct ScriptedGateway {
    default: Acknowledgement,
    stalls: AtomicUsize,
    queued: Mutex<VecDeque<Acknowledgement>>,
    requests: Mutex<Vec<GenerationRequest>>,
    fulfil: Option<Arc<InMemoryLedger>>,
}

impl ScriptedGateway {
    pub fn accepting() -> Self {
        Self::answering(Acknowledgement::Accepted { provider_ref: None })
    }

    pub fn rejecting(message: impl Into<String>) -> Self {
        Self::answering(Acknowledgement::Rejected {
            message: message.into(),
        })
    }

    fn answering(default: Acknowledgement) -> Self {
        Self {
            default,
            stalls: AtomicUsize::new(0),
            queued: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            fulfil: None,
        }
    }

    pub fn fulfil_into(mut self, ledger: Arc<InMemoryLedger>) -> Self {
        self.fulfil = Some(ledger);
        self
    }

    /// Answer the next unanswered request with `ack`.
    pub fn queue(&self, ack: Acknowledgement) {
        self.queued
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push_back(ack);
    }

    /// Never answer the next `n` requests.
    pub fn stall_next(&self, n: usize) {
        self.stalls.fetch_add(n, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[async_trait]
impl SubmissionGateway for ScriptedGateway {
    async fn send(&self, request: &GenerationRequest) -> Acknowledgement {
        self.requests
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(request.clone());

        let stall = self
            .stalls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if stall {
            std::future::pending::<()>().await;
        }

        let ack = self
            .queued
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front()
            .unwrap_or_else(|| self.default.clone());

        if let (Acknowledgement::Accepted { .. }, Some(ledger)) = (&ack, &self.fulfil) {
            for _ in 0..request.count {
                ledger.push(request.owner_id, request.kind, request.style.as_deref());
            }
        }
        ack
    }
}
