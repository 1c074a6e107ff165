//! Content ledger rows and DTOs.

use persona_core::content::{ContentItem, ContentKind};
use persona_core::error::CoreError;
use persona_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `content_items` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ContentRow {
    pub id: DbId,
    pub owner_id: DbId,
    pub kind: String,
    pub style: Option<String>,
    pub url: String,
    pub created_at: Timestamp,
}

impl TryFrom<ContentRow> for ContentItem {
    type Error = CoreError;

    fn try_from(row: ContentRow) -> Result<Self, Self::Error> {
        Ok(ContentItem {
            id: row.id,
            owner_id: row.owner_id,
            kind: ContentKind::from_name(&row.kind)?,
            style: row.style,
            created_at: row.created_at,
            url: row.url,
        })
    }
}

/// DTO for recording a content item (e.g. a confirmed profile image).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateContent {
    pub owner_id: DbId,
    pub kind: ContentKind,
    #[serde(default)]
    pub style: Option<String>,
    pub url: String,
}

/// Filter for listing an owner's content.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentFilter {
    pub kind: Option<ContentKind>,
    /// Compared case-insensitively.
    pub style: Option<String>,
}
