//! Repository for the `content_items` table.

use persona_core::types::DbId;
use sqlx::PgPool;

use crate::models::content::{ContentFilter, ContentRow, CreateContent};

/// Column list for `content_items` queries.
const COLUMNS: &str = "id, owner_id, kind, style, url, created_at";

/// `WHERE` clause shared by listing and counting. `$2`/`$3` are nullable
/// and disable their filter when NULL.
const OWNER_FILTER: &str = "\
    owner_id = $1 \
    AND ($2::TEXT IS NULL OR kind = $2) \
    AND ($3::TEXT IS NULL OR lower(trim(style)) = lower(trim($3)))";

/// Provides read/create/delete access to the content ledger.
pub struct ContentRepo;

impl ContentRepo {
    /// List an owner's content, newest first (ties broken by higher id).
    pub async fn list_for_owner(
        pool: &PgPool,
        owner_id: DbId,
        filter: &ContentFilter,
    ) -> Result<Vec<ContentRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM content_items \
             WHERE {OWNER_FILTER} \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, ContentRow>(&query)
            .bind(owner_id)
            .bind(filter.kind.map(|k| k.as_str()))
            .bind(filter.style.as_deref())
            .fetch_all(pool)
            .await
    }

    /// Count an owner's content matching the filter.
    pub async fn count_for_owner(
        pool: &PgPool,
        owner_id: DbId,
        filter: &ContentFilter,
    ) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*) FROM content_items WHERE {OWNER_FILTER}");
        sqlx::query_scalar::<_, i64>(&query)
            .bind(owner_id)
            .bind(filter.kind.map(|k| k.as_str()))
            .bind(filter.style.as_deref())
            .fetch_one(pool)
            .await
    }

    /// Insert a content item and return the stored row.
    pub async fn create(pool: &PgPool, input: &CreateContent) -> Result<ContentRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO content_items (owner_id, kind, style, url) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ContentRow>(&query)
            .bind(input.owner_id)
            .bind(input.kind.as_str())
            .bind(input.style.as_deref())
            .bind(&input.url)
            .fetch_one(pool)
            .await
    }

    /// Delete a content item. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM content_items WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
