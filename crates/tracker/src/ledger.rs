//! Access to the shared content ledger.
//!
//! [`ContentLedger`] is the seam the snapshotter and detector read
//! through. [`PgContentLedger`] is the production adapter over
//! [`ContentRepo`]; an in-memory double lives in [`crate::testing`].

use async_trait::async_trait;
use persona_core::content::{ContentItem, TargetPredicate};
use persona_core::error::CoreError;
use persona_core::types::DbId;
use persona_db::models::content::{ContentFilter, ContentRow, CreateContent};
use persona_db::repositories::ContentRepo;
use persona_db::DbPool;

/// Errors from a ledger query.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row could not be mapped to a [`ContentItem`].
    #[error("Corrupt ledger row: {0}")]
    Corrupt(#[from] CoreError),

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

/// Filter equivalent to a job's target predicate.
pub fn filter_for(predicate: &TargetPredicate) -> ContentFilter {
    ContentFilter {
        kind: Some(predicate.kind),
        style: predicate.style.clone(),
    }
}

/// Read/create/delete access to content items, keyed by owner.
#[async_trait]
pub trait ContentLedger: Send + Sync {
    /// List an owner's items, newest first.
    async fn list_for_owner(
        &self,
        owner_id: DbId,
        filter: &ContentFilter,
    ) -> Result<Vec<ContentItem>, LedgerError>;

    /// Count items satisfying `predicate`.
    async fn count_matching(&self, predicate: &TargetPredicate) -> Result<usize, LedgerError> {
        let items = self
            .list_for_owner(predicate.owner_id, &filter_for(predicate))
            .await?;
        Ok(items.iter().filter(|i| predicate.matches(i)).count())
    }

    async fn create(&self, input: &CreateContent) -> Result<ContentItem, LedgerError>;

    /// Returns `true` if an item was removed.
    async fn delete(&self, id: DbId) -> Result<bool, LedgerError>;

    /// Confirm the ledger is reachable.
    async fn ping(&self) -> Result<(), LedgerError>;
}

// ---------------------------------------------------------------------------
// Postgres adapter
// ---------------------------------------------------------------------------

/// [`ContentLedger`] backed by the `content_items` table.
pub struct PgContentLedger {
    pool: DbPool,
}

impl PgContentLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn into_items(rows: Vec<ContentRow>) -> Result<Vec<ContentItem>, LedgerError> {
    rows.into_iter()
        .map(|row| ContentItem::try_from(row).map_err(LedgerError::from))
        .collect()
}

#[async_trait]
impl ContentLedger for PgContentLedger {
    async fn list_for_owner(
        &self,
        owner_id: DbId,
        filter: &ContentFilter,
    ) -> Result<Vec<ContentItem>, LedgerError> {
        let rows = ContentRepo::list_for_owner(&self.pool, owner_id, filter).await?;
        into_items(rows)
    }

    async fn count_matching(&self, predicate: &TargetPredicate) -> Result<usize, LedgerError> {
        let count =
            ContentRepo::count_for_owner(&self.pool, predicate.owner_id, &filter_for(predicate))
                .await?;
        Ok(count.max(0) as usize)
    }

    async fn create(&self, input: &CreateContent) -> Result<ContentItem, LedgerError> {
        let row = ContentRepo::create(&self.pool, input).await?;
        tracing::info!(
            content_id = row.id,
            owner_id = row.owner_id,
            kind = %row.kind,
            "Content item recorded",
        );
        Ok(ContentItem::try_from(row)?)
    }

    async fn delete(&self, id: DbId) -> Result<bool, LedgerError> {
        let deleted = ContentRepo::delete(&self.pool, id).await?;
        if deleted {
            tracing::info!(content_id = id, "Content item deleted");
        }
        Ok(deleted)
    }

    async fn ping(&self) -> Result<(), LedgerError> {
        persona_db::health_check(&self.pool).await?;
        Ok(())
    }
}
