//! API route configuration.

use axum::{
    Router,
    routing::{get, patch},
};
use novabase_persistence::core::{Backend, TransactionProvider};

use crate::handlers;
use crate::state::AppState;

/// Creates all API routes.
///
/// # Routes
///
/// ## Status
/// - `GET /` - Service status
/// - `GET /health` - Health check
/// - `GET /_liveness` - Liveness check
/// - `GET /_readiness` - Readiness check
///
/// ## Tables
/// - `GET /api/{table}` - List rows
/// - `POST /api/{table}` - Create a row
/// - `PATCH /api/{table}/{id}` - Update a row
/// - `DELETE /api/{table}/{id}` - Delete a row
///
/// ## Audit
/// - `GET /audit` - Audit trail of the caller's tenant
pub fn create_routes<B>(state: AppState<B>) -> Router
where
    B: Backend + TransactionProvider + 'static,
{
    Router::new()
        .route("/", get(handlers::root_handler))
        .route("/health", get(handlers::health_handler::<B>))
        .route("/_liveness", get(handlers::liveness_handler))
        .route("/_readiness", get(handlers::readiness_handler::<B>))
        .route(
            "/api/{table}",
            get(handlers::list_handler::<B>).post(handlers::create_handler::<B>),
        )
        .route(
            "/api/{table}/{id}",
            patch(handlers::update_handler::<B>).delete(handlers::delete_handler::<B>),
        )
        .route("/audit", get(handlers::audit_handler::<B>))
        .with_state(state)
}
