//! Status and health check handlers.
//!
//! None of these require a bearer token.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use novabase_persistence::core::{Backend, TransactionProvider};
use tracing::{debug, warn};

use crate::state::AppState;

/// Handler for the root status endpoint.
///
/// # HTTP Request
///
/// `GET /`
pub async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "online",
        "service": "novabase",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Handler for the health check endpoint.
///
/// # HTTP Request
///
/// `GET /health`
pub async fn health_handler<B>(State(state): State<AppState<B>>) -> Response
where
    B: Backend + TransactionProvider + 'static,
{
    debug!("Processing health check request");

    let health_response = serde_json::json!({
        "status": "healthy",
        "backend": state.backend_name(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    });

    (StatusCode::OK, Json(health_response)).into_response()
}

/// Handler for the liveness check.
///
/// # HTTP Request
///
/// `GET /_liveness`
pub async fn liveness_handler() -> impl IntoResponse {
    StatusCode::OK
}

/// Handler for the readiness check. Runs a store health check.
///
/// # HTTP Request
///
/// `GET /_readiness`
///
/// # Response
///
/// - `200 OK` - The store answered
/// - `503 Service Unavailable` - The store did not answer
pub async fn readiness_handler<B>(State(state): State<AppState<B>>) -> Response
where
    B: Backend + TransactionProvider + 'static,
{
    debug!("Processing readiness check request");

    match state.engine().health_check().await {
        Ok(()) => {
            let response = serde_json::json!({
                "status": "ready",
                "backend": state.backend_name(),
                "checks": { "storage": "ok" }
            });
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            warn!(error = %e, "Readiness check failed");
            let response = serde_json::json!({
                "status": "unavailable",
                "backend": state.backend_name(),
                "checks": { "storage": "failed" }
            });
            (StatusCode::SERVICE_UNAVAILABLE, Json(response)).into_response()
        }
    }
}
