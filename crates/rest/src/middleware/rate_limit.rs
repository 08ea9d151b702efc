//! Rate-limit middleware.
//!
//! Consults the state's [`RateLimiter`](crate::rate_limit::RateLimiter)
//! before any handler runs. Refused requests get 429 with `Retry-After`.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::error::RestError;
use crate::rate_limit::RateLimitDecision;
use crate::state::AppState;

/// Key used when the client address is unknown.
const UNKNOWN_CLIENT: &str = "unknown";

/// Derives the rate-limit key of a request: the client IP.
///
/// With `trust_forwarded_for`, the first `X-Forwarded-For` entry wins over
/// the socket address.
pub fn client_key(request: &Request, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Middleware function for rate limiting.
///
/// This can be used with `axum::middleware::from_fn_with_state`.
pub async fn rate_limit_middleware<B>(
    State(state): State<AppState<B>>,
    request: Request,
    next: Next,
) -> Response
where
    B: Send + Sync + 'static,
{
    let key = client_key(&request, state.config().trust_forwarded_for);
    match state.rate_limiter().check(&key) {
        RateLimitDecision::Allowed => next.run(request).await,
        RateLimitDecision::Limited { retry_after } => {
            warn!(client = %key, retry_after_secs = retry_after.as_secs(), "Rate limit exceeded");
            RestError::RateLimited { retry_after }.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(forwarded: Option<&str>) -> Request {
        let mut builder = Request::builder().uri("/api/notes");
        if let Some(value) = forwarded {
            builder = builder.header("x-forwarded-for", value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_forwarded_for_only_when_trusted() {
        let req = request(Some("203.0.113.7, 10.0.0.1"));
        assert_eq!(client_key(&req, true), "203.0.113.7");
        assert_eq!(client_key(&req, false), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_connect_info() {
        let mut req = request(None);
        let addr: SocketAddr = "198.51.100.2:5555".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        assert_eq!(client_key(&req, true), "198.51.100.2");
    }
}
