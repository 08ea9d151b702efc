//! Audit logging.
//!
//! Records are appended through the caller's [`BoundTransaction`], never
//! a transaction of their own, so a record is committed or discarded
//! together with the mutation it describes.

use serde_json::Value;

use crate::core::StoreTransaction;
use crate::error::{BackendError, StorageError, StorageResult};
use crate::tenant::BoundTransaction;
use crate::types::{AuditAction, AuditRecord, ID_COLUMN, Payload, Row, USER_COLUMN};

/// Placeholder record id for rows with neither an `id` nor a `user_id`.
pub const UNKNOWN_RECORD_ID: &str = "unknown";

/// Component named in errors raised by a failed audit write.
const AUDIT_COMPONENT: &str = "audit_logs";

/// Appends mutation records to the audit ledger.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditLogger;

impl AuditLogger {
    /// Records a mutation inside the bound transaction.
    ///
    /// Tenant and user are taken from the transaction's context. A failed
    /// write is reported as an internal backend error whatever the store
    /// said, since it never reflects on the caller's payload.
    pub async fn record<T: StoreTransaction>(
        tx: &mut BoundTransaction<T>,
        action: AuditAction,
        table: &str,
        record_id: &str,
        snapshot: Option<&Payload>,
    ) -> StorageResult<AuditRecord> {
        let context = tx.context();
        let record = AuditRecord::new(
            context.tenant_id().clone(),
            context.user_id().clone(),
            action,
            table,
            record_id,
            snapshot.map(Payload::to_json),
        );

        if let Err(e) = tx.transaction().insert_audit(&record).await {
            tracing::error!(action = %action, table = table, error = %e, "Audit write failed");
            return Err(StorageError::Backend(BackendError::Internal {
                backend_name: AUDIT_COMPONENT.to_string(),
                message: format!("failed to write audit record: {}", e),
                source: Some(Box::new(e)),
            }));
        }
        tracing::debug!(
            action = %action,
            table = table,
            record_id = record_id,
            "Audit record written"
        );
        Ok(record)
    }
}

/// Derives the audit record id of a stored row: its `id`, else its `user_id`.
pub fn record_id_of(row: &Row) -> String {
    [ID_COLUMN, USER_COLUMN]
        .iter()
        .filter_map(|column| row.get(*column))
        .find_map(|value| match value {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
        .unwrap_or_else(|| UNKNOWN_RECORD_ID.to_string())
}
