//! Generic table handlers.
//!
//! Every handler passes the path's table name to the engine untouched;
//! whether the table is reachable is decided by the registry, never here.
//!
//! | Method | Path | Success |
//! |--------|------|---------|
//! | GET | `/api/{table}` | 200, array of rows |
//! | POST | `/api/{table}` | 201, created row |
//! | PATCH | `/api/{table}/{id}` | 200, updated row |
//! | DELETE | `/api/{table}/{id}` | 200, `{"status", "message"}` |

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use novabase_persistence::core::{Backend, TransactionProvider};
use tracing::debug;

use crate::error::{RestError, RestResult};
use crate::extractors::{Identity, JsonPayload};
use crate::state::AppState;

/// Handler for listing a table.
///
/// # HTTP Request
///
/// `GET /api/{table}`
///
/// # Response
///
/// - `200 OK` - Rows visible to the caller's tenant
/// - `404 Not Found` - Table not exposed
pub async fn list_handler<B>(
    State(state): State<AppState<B>>,
    Path(table): Path<String>,
    Identity(ctx): Identity,
) -> RestResult<Response>
where
    B: Backend + TransactionProvider + 'static,
{
    debug!(table = %table, tenant = %ctx.tenant_id(), "Processing list request");

    let rows = state
        .engine()
        .list(&ctx, &table)
        .await
        .map_err(|e| RestError::from_storage(e, ctx.correlation_id()))?;

    Ok((StatusCode::OK, Json(rows)).into_response())
}

/// Handler for creating a row.
///
/// # HTTP Request
///
/// `POST /api/{table}`
///
/// # Response
///
/// - `201 Created` - The stored row
/// - `400 Bad Request` - Unknown field, empty payload or integrity violation
/// - `403 Forbidden` - Protected field in the payload
/// - `404 Not Found` - Table not exposed
///
/// # Example
///
/// ```http
/// POST /api/notes HTTP/1.1
/// Authorization: Bearer <token>
/// Content-Type: application/json
///
/// {"title": "hello"}
/// ```
pub async fn create_handler<B>(
    State(state): State<AppState<B>>,
    Path(table): Path<String>,
    Identity(ctx): Identity,
    JsonPayload(body): JsonPayload,
) -> RestResult<Response>
where
    B: Backend + TransactionProvider + 'static,
{
    debug!(table = %table, tenant = %ctx.tenant_id(), "Processing create request");

    let row = state
        .engine()
        .create(&ctx, &table, body)
        .await
        .map_err(|e| RestError::from_storage(e, ctx.correlation_id()))?;

    Ok((StatusCode::CREATED, Json(row)).into_response())
}

/// Handler for updating a row.
///
/// # HTTP Request
///
/// `PATCH /api/{table}/{id}`
///
/// # Response
///
/// - `200 OK` - The updated row
/// - `400 Bad Request` - Unknown field or integrity violation
/// - `403 Forbidden` - Protected field in the payload
/// - `404 Not Found` - Table not exposed, or row absent or owned by another tenant
pub async fn update_handler<B>(
    State(state): State<AppState<B>>,
    Path((table, id)): Path<(String, String)>,
    Identity(ctx): Identity,
    JsonPayload(body): JsonPayload,
) -> RestResult<Response>
where
    B: Backend + TransactionProvider + 'static,
{
    debug!(table = %table, tenant = %ctx.tenant_id(), "Processing update request");

    let row = state
        .engine()
        .update(&ctx, &table, &id, body)
        .await
        .map_err(|e| RestError::from_storage(e, ctx.correlation_id()))?;

    Ok((StatusCode::OK, Json(row)).into_response())
}

/// Handler for deleting a row.
///
/// # HTTP Request
///
/// `DELETE /api/{table}/{id}`
///
/// # Response
///
/// - `200 OK` - `{"status": "success", "message": "Record {id} deleted."}`
/// - `404 Not Found` - Table not exposed, or row absent or owned by another tenant
pub async fn delete_handler<B>(
    State(state): State<AppState<B>>,
    Path((table, id)): Path<(String, String)>,
    Identity(ctx): Identity,
) -> RestResult<Response>
where
    B: Backend + TransactionProvider + 'static,
{
    debug!(table = %table, tenant = %ctx.tenant_id(), "Processing delete request");

    let outcome = state
        .engine()
        .delete(&ctx, &table, &id)
        .await
        .map_err(|e| RestError::from_storage(e, ctx.correlation_id()))?;

    Ok((StatusCode::OK, Json(outcome)).into_response())
}
