//! Content ledger items and the predicate a job uses to recognise its output.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Content kinds
// ---------------------------------------------------------------------------

/// Kind of generated media stored in the content ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// The single avatar image shown on a profile.
    ProfileImage,
    /// One image of a training set used to fine-tune a profile.
    TrainingImage,
    /// An image rendered in a named style.
    StyledImage,
    /// Scheduled content for one calendar day.
    DailyPost,
}

impl ContentKind {
    /// Every kind, in declaration order.
    pub const ALL: [ContentKind; 4] = [
        Self::ProfileImage,
        Self::TrainingImage,
        Self::StyledImage,
        Self::DailyPost,
    ];

    /// Value stored in the ledger's `kind` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProfileImage => "profile_image",
            Self::TrainingImage => "training_image",
            Self::StyledImage => "styled_image",
            Self::DailyPost => "daily_post",
        }
    }

    /// Parse the ledger's `kind` column.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == name)
            .ok_or_else(|| CoreError::Validation(format!("Unknown content kind '{name}'")))
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ContentItem
// ---------------------------------------------------------------------------

/// A record in the shared content ledger. Read-only from the tracker's
/// point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: DbId,
    pub owner_id: DbId,
    pub kind: ContentKind,
    pub style: Option<String>,
    pub created_at: Timestamp,
    pub url: String,
}

// ---------------------------------------------------------------------------
// TargetPredicate
// ---------------------------------------------------------------------------

/// Criteria a ledger item must satisfy to count toward a job.
///
/// Style comparison is case-insensitive. A predicate without a style
/// matches items of any style (including none).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetPredicate {
    pub owner_id: DbId,
    pub kind: ContentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

impl TargetPredicate {
    pub fn new(owner_id: DbId, kind: ContentKind) -> Self {
        Self {
            owner_id,
            kind,
            style: None,
        }
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// Whether `item` satisfies this predicate.
    pub fn matches(&self, item: &ContentItem) -> bool {
        if item.owner_id != self.owner_id || item.kind != self.kind {
            return false;
        }
        match &self.style {
            None => true,
            Some(wanted) => item
                .style
                .as_deref()
                .is_some_and(|s| s.trim().to_lowercase() == wanted.trim().to_lowercase()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
