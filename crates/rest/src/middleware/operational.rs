//! Operational middleware.
//!
//! Assigns every request a UUID v4 request id, returned as `X-Request-ID`
//! and used as the correlation id of internal errors. Adds the security
//! headers and `X-Process-Time` (seconds) to every response and writes one
//! structured log line per request. Bodies are never logged.

use std::time::Instant;

use axum::{
    extract::Request,
    http::{HeaderValue, header, header::HeaderName},
    middleware::Next,
    response::Response,
};
use tracing::info;
use uuid::Uuid;

/// Header carrying the request id.
pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Header carrying the handling time in seconds.
pub static X_PROCESS_TIME: HeaderName = HeaderName::from_static("x-process-time");

/// Request id stored in the request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(String);

impl RequestId {
    /// Generates a fresh request id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Middleware function for request ids, security headers and request logging.
///
/// This can be used with `axum::middleware::from_fn`.
pub async fn operational_middleware(mut request: Request, next: Next) -> Response {
    let started = Instant::now();
    let request_id = RequestId::generate();
    request.extensions_mut().insert(request_id.clone());

    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let mut response = next.run(request).await;
    let elapsed = started.elapsed();

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        headers.insert(X_REQUEST_ID.clone(), value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("{:.6}", elapsed.as_secs_f64())) {
        headers.insert(X_PROCESS_TIME.clone(), value);
    }
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'self'"),
    );

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = elapsed.as_millis() as u64,
        request_id = %request_id.as_str(),
        "Handled request"
    );

    response
}
