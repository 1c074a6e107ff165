//! REST client for the generation provider.
//!
//! Wraps the provider's HTTP API (request submission) using [`reqwest`].

use std::time::Duration;

use crate::messages::{ErrorBody, GenerationRequest, SubmitResponse};

/// Path of the submission endpoint, relative to the base URL.
const GENERATIONS_PATH: &str = "/v1/generations";

/// Upper bound on a single submission round trip.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// HTTP client for one provider deployment.
pub struct GenerationApi {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

/// Errors from the provider REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum ProviderApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("Provider API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Error message from the body, or the raw body.
        body: String,
    },
}

impl GenerationApi {
    /// Create a new API client.
    ///
    /// * `api_url` - Base HTTP URL, e.g. `https://provider.example`.
    /// * `api_key` - Optional bearer token.
    ///
    /// Requests time out after [`REQUEST_TIMEOUT`].
    pub fn new(api_url: String, api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self::with_client(client, api_url, api_key)
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: String, api_key: Option<String>) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Base URL the client talks to.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Submit a generation request.
    ///
    /// Sends `POST /v1/generations`. A 2xx answer is parsed as a
    /// [`SubmitResponse`], which may itself carry `accepted: false`.
    pub async fn submit(
        &self,
        request: &GenerationRequest,
    ) -> Result<SubmitResponse, ProviderApiError> {
        let mut builder = self
            .client
            .post(format!("{}{GENERATIONS_PATH}", self.api_url))
            .json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let ack: SubmitResponse = Self::parse_response(response).await?;

        tracing::debug!(
            owner_id = request.owner_id,
            kind = %request.kind,
            accepted = ack.accepted,
            provider_ref = ?ack.provider_ref,
            "Provider acknowledged generation request",
        );

        Ok(ack)
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code, extracting the
    /// provider's error message on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ProviderApiError> {
        let status = response.status();
        if !status.is_success() {
            let raw = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ProviderApiError::ApiError {
                status: status.as_u16(),
                body: error_message(&raw),
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ProviderApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Pull `error` / `message` out of a JSON error body, falling back to the
/// raw text.
fn error_message(raw: &str) -> String {
    serde_json::from_str::<ErrorBody>(raw)
        .map(|b| b.error)
        .unwrap_or_else(|_| raw.trim().to_string())
}
