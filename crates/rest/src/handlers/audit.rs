//! Audit trail handler.

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use novabase_persistence::core::{Backend, TransactionProvider};
use tracing::debug;

use crate::error::{RestError, RestResult};
use crate::extractors::Identity;
use crate::state::AppState;

/// Handler for the caller tenant's audit trail, newest first.
///
/// # HTTP Request
///
/// `GET /audit`
pub async fn audit_handler<B>(
    State(state): State<AppState<B>>,
    Identity(ctx): Identity,
) -> RestResult<Response>
where
    B: Backend + TransactionProvider + 'static,
{
    debug!(tenant = %ctx.tenant_id(), "Processing audit trail request");

    let records = state
        .engine()
        .audit_trail(&ctx)
        .await
        .map_err(|e| RestError::from_storage(e, ctx.correlation_id()))?;

    Ok(Json(records).into_response())
}
