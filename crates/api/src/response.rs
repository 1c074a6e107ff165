//! Shared response envelope.
//!
//! All API responses use a `{ "data": ... }` envelope; handlers return
//! [`DataResponse`] rather than building the JSON by hand.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
