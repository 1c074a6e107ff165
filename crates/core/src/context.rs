//! Context ids scope one tracked unit of generation work.

use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// Opaque identifier scoping a generation job (one image slot, one style,
/// one calendar day...). At most one active job exists per id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(String);

impl ContextId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Profile image slot for an owner (`slot` distinguishes alternates).
    pub fn profile_image(owner_id: DbId, slot: u32) -> Self {
        Self(format!("{owner_id}:profile:{slot}"))
    }

    /// The training image set of an owner.
    pub fn training_set(owner_id: DbId) -> Self {
        Self(format!("{owner_id}:training"))
    }

    /// A styled image for an owner. The style is lower-cased so that
    /// `Noir` and `noir` share a context.
    pub fn styled_image(owner_id: DbId, style: &str) -> Self {
        Self(format!(
            "{owner_id}:style:{}",
            style.trim().to_lowercase()
        ))
    }

    /// The scheduled post of an owner for one day.
    pub fn daily_post(owner_id: DbId, date: chrono::NaiveDate) -> Self {
        Self(format!("{owner_id}:day:{}", date.format("%Y-%m-%d")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContextId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ContextId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
