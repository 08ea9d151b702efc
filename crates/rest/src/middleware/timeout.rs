//! Request timeout middleware.
//!
//! A handler that outlives the configured limit is dropped and the client
//! gets 408 with the usual JSON error body.

use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::error::RestError;

/// Middleware function bounding request handling time.
///
/// This can be used with `axum::middleware::from_fn_with_state`, the state
/// being the limit.
pub async fn timeout_middleware(
    State(limit): State<Duration>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            warn!(path = %path, limit_secs = limit.as_secs_f64(), "Request timed out");
            RestError::Timeout.into_response()
        }
    }
}
