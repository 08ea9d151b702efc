//! Error types for the NovaBase API.
//!
//! Every error is returned as a JSON body with a stable machine-readable
//! reason:
//!
//! ```json
//! {"error": {"reason": "not_found", "message": "Resource not found or access denied."}}
//! ```
//!
//! # Error Mapping
//!
//! | Storage Error | HTTP Status | Reason |
//! |--------------|-------------|--------|
//! | NotExposed, SchemaNotFound, NotFoundOrForbidden | 404 | not_found |
//! | SecurityContextMissing | 403 | security_context_missing |
//! | SecurityViolation | 403 | security_violation |
//! | UnknownField | 400 | unknown_field |
//! | EmptyPayload | 400 | empty_payload |
//! | InvalidPayload | 400 | invalid_payload |
//! | IntegrityViolation | 400 | integrity_violation |
//! | InvalidValue | 400 | invalid_value |
//! | Backend, Transaction | 500 | internal_error |
//!
//! The three not-found causes share one message so a response never tells
//! an unregistered table from a missing one, or a foreign row from an
//! absent one. Internal errors carry a `trace_id` and an opaque message;
//! the detail is only logged.

use std::time::Duration;

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use novabase_persistence::error::{
    AccessError, IntegrityError, StorageError, ValidationError,
};
use serde_json::json;
use thiserror::Error;

/// Message shared by every not-found outcome.
pub const NOT_FOUND_MESSAGE: &str = "Resource not found or access denied.";

/// The primary error type for REST API operations.
#[derive(Debug, Error)]
pub enum RestError {
    /// Table or row not reachable (HTTP 404).
    #[error("{}", NOT_FOUND_MESSAGE)]
    NotFound,

    /// No tenant context reached the store (HTTP 403).
    #[error("Security context missing.")]
    SecurityContextMissing,

    /// Attempt to write a protected field (HTTP 403).
    #[error("{message}")]
    SecurityViolation {
        /// Error message.
        message: String,
    },

    /// Malformed payload or constraint failure (HTTP 400).
    #[error("{message}")]
    BadRequest {
        /// Stable reason code.
        reason: &'static str,
        /// Error message.
        message: String,
    },

    /// Missing or invalid bearer token (HTTP 401).
    #[error("{message}")]
    Unauthorized {
        /// Error message.
        message: String,
    },

    /// Request body above the configured limit (HTTP 413).
    #[error("Request body too large.")]
    PayloadTooLarge,

    /// Handling took longer than the configured limit (HTTP 408).
    #[error("Request timed out.")]
    Timeout,

    /// Too many requests from one client (HTTP 429).
    #[error("Rate limit exceeded. Try again in {} seconds.", .retry_after.as_secs())]
    RateLimited {
        /// Time until the client may retry.
        retry_after: Duration,
    },

    /// Internal server error (HTTP 500). `message` is logged, never returned.
    #[error("Internal error: {message}")]
    Internal {
        /// Detail for the log.
        message: String,
        /// Correlation id returned to the client.
        trace_id: String,
    },
}

impl RestError {
    /// Converts a storage error, tagging internal failures with `trace_id`.
    pub fn from_storage(err: StorageError, trace_id: Option<&str>) -> Self {
        match err {
            StorageError::Access(e) => e.into(),
            StorageError::Validation(e) => e.into(),
            StorageError::Integrity(e) => e.into(),
            other => RestError::Internal {
                message: other.to_string(),
                trace_id: trace_id
                    .map(str::to_string)
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            },
        }
    }

    /// Returns the HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            RestError::NotFound => StatusCode::NOT_FOUND,
            RestError::SecurityContextMissing | RestError::SecurityViolation { .. } => {
                StatusCode::FORBIDDEN
            }
            RestError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            RestError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            RestError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            RestError::Timeout => StatusCode::REQUEST_TIMEOUT,
            RestError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            RestError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the stable reason code for this error.
    pub fn reason(&self) -> &'static str {
        match self {
            RestError::NotFound => "not_found",
            RestError::SecurityContextMissing => "security_context_missing",
            RestError::SecurityViolation { .. } => "security_violation",
            RestError::BadRequest { reason, .. } => *reason,
            RestError::Unauthorized { .. } => "unauthorized",
            RestError::PayloadTooLarge => "payload_too_large",
            RestError::Timeout => "request_timeout",
            RestError::RateLimited { .. } => "rate_limited",
            RestError::Internal { .. } => "internal_error",
        }
    }

    fn bad_request(reason: &'static str, message: impl Into<String>) -> Self {
        RestError::BadRequest {
            reason,
            message: message.into(),
        }
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let status = self.status();
        let reason = self.reason();

        let body = match &self {
            RestError::Internal { message, trace_id } => {
                tracing::error!(trace_id = %trace_id, error = %message, "Internal error");
                json!({
                    "error": {
                        "reason": reason,
                        "message": "An internal error occurred.",
                        "trace_id": trace_id,
                    }
                })
            }
            RestError::RateLimited { retry_after } => json!({
                "error": {
                    "reason": reason,
                    "message": self.to_string(),
                    "retry_after": retry_after.as_secs(),
                }
            }),
            _ => json!({
                "error": {
                    "reason": reason,
                    "message": self.to_string(),
                }
            }),
        };

        let mut response = (status, Json(body)).into_response();
        if let RestError::RateLimited { retry_after } = &self {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(retry_after.as_secs()),
            );
        }
        response
    }
}

/// Result type for REST API operations.
pub type RestResult<T> = Result<T, RestError>;

// Implement conversions from storage errors

impl From<StorageError> for RestError {
    fn from(err: StorageError) -> Self {
        RestError::from_storage(err, None)
    }
}

impl From<AccessError> for RestError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::NotExposed { .. }
            | AccessError::SchemaNotFound { .. }
            | AccessError::NotFoundOrForbidden => RestError::NotFound,
            AccessError::SecurityContextMissing => RestError::SecurityContextMissing,
        }
    }
}

impl From<ValidationError> for RestError {
    fn from(err: ValidationError) -> Self {
        let message = err.to_string();
        match err {
            ValidationError::SecurityViolation { .. } => RestError::SecurityViolation { message },
            ValidationError::UnknownField { .. } => RestError::bad_request("unknown_field", message),
            ValidationError::EmptyPayload => RestError::bad_request("empty_payload", message),
            ValidationError::InvalidPayload => RestError::bad_request("invalid_payload", message),
            ValidationError::MissingIdentity { .. } => RestError::Unauthorized { message },
            ValidationError::ReservedTable { .. } | ValidationError::MissingTenantColumn { .. } => {
                RestError::bad_request("invalid_registration", message)
            }
        }
    }
}

impl From<IntegrityError> for RestError {
    fn from(err: IntegrityError) -> Self {
        match err {
            IntegrityError::IntegrityViolation { .. } => {
                RestError::bad_request("integrity_violation", "Database integrity violation.")
            }
            IntegrityError::InvalidValue { .. } => {
                RestError::bad_request("invalid_value", err.to_string())
            }
        }
    }
}
