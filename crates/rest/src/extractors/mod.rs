//! Axum extractors for the table API.
//!
//! - [`Identity`] - Verified tenant context from the bearer token
//! - [`JsonPayload`] - Request body as a JSON value, with JSON error rejections

mod identity;
mod json_payload;

pub use identity::Identity;
pub use json_payload::JsonPayload;
