//! Submission of generation requests to the provider.
//!
//! An acknowledgement only says whether the provider took the request;
//! completion is inferred separately by polling the ledger.

use async_trait::async_trait;
use persona_provider::{GenerationApi, GenerationRequest, ProviderApiError};

/// Fallback message when the provider refuses without saying why.
const UNSPECIFIED_REJECTION: &str = "request rejected by provider";

/// Provider answer to a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acknowledgement {
    Accepted { provider_ref: Option<String> },
    /// Validation or transport failure; `message` is recorded verbatim.
    Rejected { message: String },
}

#[async_trait]
pub trait SubmissionGateway: Send + Sync {
    /// Send a request and return once the provider has acknowledged it.
    async fn send(&self, request: &GenerationRequest) -> Acknowledgement;
}

/// [`SubmissionGateway`] over the provider's REST API.
pub struct HttpGateway {
    api: GenerationApi,
}

impl HttpGateway {
    pub fn new(api: GenerationApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl SubmissionGateway for HttpGateway {
    async fn send(&self, request: &GenerationRequest) -> Acknowledgement {
        match self.api.submit(request).await {
            Ok(ack) if ack.accepted => Acknowledgement::Accepted {
                provider_ref: ack.provider_ref,
            },
            Ok(ack) => Acknowledgement::Rejected {
                message: ack
                    .error
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| UNSPECIFIED_REJECTION.to_string()),
            },
            Err(ProviderApiError::ApiError { status, body }) => {
                tracing::warn!(status, owner_id = request.owner_id, "Provider refused request");
                Acknowledgement::Rejected { message: body }
            }
            Err(e) => {
                tracing::warn!(error = %e, owner_id = request.owner_id, "Provider unreachable");
                Acknowledgement::Rejected {
                    message: e.to_string(),
                }
            }
        }
    }
}
