//! Audit ledger records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::tenant::{TenantId, UserId};

/// Kind of mutation an audit record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    /// A row was inserted.
    Create,
    /// A row was updated.
    Update,
    /// A row was deleted.
    Delete,
}

impl AuditAction {
    /// Returns the stored spelling of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(AuditAction::Create),
            "UPDATE" => Ok(AuditAction::Update),
            "DELETE" => Ok(AuditAction::Delete),
            other => Err(format!("unknown audit action: {}", other)),
        }
    }
}

/// An immutable record of one committed mutation.
///
/// Written in the same transaction as the mutation it describes, so it
/// exists if and only if that mutation was committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Record id.
    pub id: Uuid,
    /// Tenant the mutation ran under.
    pub tenant_id: TenantId,
    /// User that performed the mutation.
    pub user_id: UserId,
    /// Kind of mutation.
    pub action: AuditAction,
    /// Table that was mutated.
    pub table_name: String,
    /// Identifier of the affected row.
    pub record_id: String,
    /// Snapshot of the written values; absent for deletes.
    pub payload: Option<Value>,
    /// When the record was written.
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    /// Creates a new record stamped with a fresh id and the current time.
    pub fn new(
        tenant_id: TenantId,
        user_id: UserId,
        action: AuditAction,
        table_name: impl Into<String>,
        record_id: impl Into<String>,
        payload: Option<Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            user_id,
            action,
            table_name: table_name.into(),
            record_id: record_id.into(),
            payload,
            timestamp: Utc::now(),
        }
    }
}
