//! Request and acknowledgement payloads exchanged with the provider.

use persona_core::content::ContentKind;
use persona_core::job::StartJob;
use persona_core::types::DbId;
use serde::{Deserialize, Serialize};

/// Body of a generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub owner_id: DbId,
    pub kind: ContentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Number of items to produce.
    pub count: u32,
    /// Free-form attributes describing what to render.
    pub brief: serde_json::Value,
}

impl From<&StartJob> for GenerationRequest {
    fn from(start: &StartJob) -> Self {
        let predicate = start.predicate();
        Self {
            owner_id: predicate.owner_id,
            kind: predicate.kind,
            style: predicate.style,
            count: start.target_count,
            brief: start.brief.clone(),
        }
    }
}

/// Acknowledgement returned by the provider. `accepted` only means the
/// request was taken, not that any output exists yet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubmitResponse {
    pub accepted: bool,
    #[serde(default)]
    pub error: Option<String>,
    /// Provider-side reference for the request, when one is issued.
    #[serde(default, alias = "job_id")]
    pub provider_ref: Option<String>,
}

/// Error body the provider sends with non-2xx statuses.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(alias = "message")]
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use persona_core::context::ContextId;

    #[test]
    fn request_from_start_job_carries_brief_and_count() {
        let start = StartJob {
            context_id: ContextId::styled_image(3, "noir"),
            owner_id: 3,
            kind: ContentKind::StyledImage,
            style: Some(" noir ".to_string()),
            target_count: 1,
            max_attempts: None,
            brief: serde_json::json!({"outfit": "trench coat"}),
        };

        let request = GenerationRequest::from(&start);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["kind"], "styled_image");
        assert_eq!(json["style"], "noir");
        assert_eq!(json["count"], 1);
        assert_eq!(json["brief"]["outfit"], "trench coat");
    }

    #[test]
    fn style_omitted_when_absent() {
        let request = GenerationRequest {
            owner_id: 1,
            kind: ContentKind::TrainingImage,
            style: None,
            count: 20,
            brief: serde_json::Value::Null,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("style").is_none());
    }

    #[test]
    fn submit_response_accepts_job_id_alias() {
        let ack: SubmitResponse =
            serde_json::from_str(r#"{"accepted": true, "job_id": "gen_123"}"#).unwrap();
        assert!(ack.accepted);
        assert_eq!(ack.provider_ref.as_deref(), Some("gen_123"));
        assert!(ack.error.is_none());
    }

    #[test]
    fn rejected_response_keeps_error() {
        let ack: SubmitResponse =
            serde_json::from_str(r#"{"accepted": false, "error": "quota exceeded"}"#).unwrap();
        assert!(!ack.accepted);
        assert_eq!(ack.error.as_deref(), Some("quota exceeded"));
    }
}
