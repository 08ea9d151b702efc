//! JSON body extractor.
//!
//! Parses the request body as JSON without judging its shape: whether it
//! must be an object is the sanitizer's call. Failures are reported in the
//! API's JSON error format instead of axum's plain-text rejections.

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::StatusCode,
};
use serde_json::Value;

use crate::error::RestError;

/// Axum extractor for a JSON request body.
#[derive(Debug)]
pub struct JsonPayload(pub Value);

impl JsonPayload {
    /// Consumes the extractor and returns the inner Value.
    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl<S> FromRequest<S> for JsonPayload
where
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                RestError::PayloadTooLarge
            } else {
                RestError::BadRequest {
                    reason: "invalid_payload",
                    message: format!("Could not read request body: {}", e.body_text()),
                }
            }
        })?;

        let value = serde_json::from_slice(&bytes).map_err(|e| RestError::BadRequest {
            reason: "invalid_payload",
            message: format!("Invalid JSON: {}", e),
        })?;

        Ok(JsonPayload(value))
    }
}
