//! HTTP client for the external media generation provider.
//!
//! The provider accepts a generation request and answers with an
//! acknowledgement only; produced media shows up later in the content
//! ledger. See `persona-tracker` for how completion is inferred.

pub mod api;
pub mod messages;

pub use api::{GenerationApi, ProviderApiError};
pub use messages::{GenerationRequest, SubmitResponse};
