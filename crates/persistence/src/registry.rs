//! The table allow-list.
//!
//! Only tables with an active `tables_meta` entry are reachable. Physical
//! existence is irrelevant: an unregistered table answers exactly like a
//! table that was never created.

use tracing::info;

use crate::core::StoreTransaction;
use crate::error::{AccessError, StorageResult, ValidationError};
use crate::schema::{SchemaIntrospector, is_valid_identifier};
use crate::types::{TENANT_COLUMN, TableRegistration};

/// System tables that can never be exposed.
pub const RESERVED_TABLES: &[&str] = &["tables_meta", "audit_logs"];

fn is_reserved(table: &str) -> bool {
    RESERVED_TABLES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(table))
}

/// Deny-by-default gate in front of every engine operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableRegistry;

impl TableRegistry {
    /// Returns `true` only if the table is registered and active.
    pub async fn is_reachable<T: StoreTransaction>(tx: &mut T, table: &str) -> StorageResult<bool> {
        if !is_valid_identifier(table) || is_reserved(table) {
            return Ok(false);
        }
        Ok(tx
            .find_registration(table)
            .await?
            .is_some_and(|registration| registration.is_active))
    }

    /// Fails with `AccessError::NotExposed` unless the table is reachable.
    pub async fn ensure_reachable<T: StoreTransaction>(tx: &mut T, table: &str) -> StorageResult<()> {
        if Self::is_reachable(tx, table).await? {
            Ok(())
        } else {
            Err(AccessError::NotExposed {
                table: table.to_string(),
            }
            .into())
        }
    }

    /// Registers a table and installs the store's tenant row policy on it.
    ///
    /// The table must physically exist and expose a `tenant_id` column.
    /// Registering an already registered table reactivates it.
    ///
    /// # Errors
    ///
    /// * `AccessError::NotExposed` - If the name is not a valid identifier
    /// * `ValidationError::ReservedTable` - If the table is a system table
    /// * `AccessError::SchemaNotFound` - If the table does not exist
    /// * `ValidationError::MissingTenantColumn` - If the table has no `tenant_id` column
    pub async fn register<T: StoreTransaction>(
        tx: &mut T,
        table: &str,
    ) -> StorageResult<TableRegistration> {
        if is_reserved(table) {
            return Err(ValidationError::ReservedTable {
                table: table.to_string(),
            }
            .into());
        }

        let schema = SchemaIntrospector::describe(tx, table).await?;
        if !schema.is_tenant_scoped() {
            return Err(ValidationError::MissingTenantColumn {
                table: table.to_string(),
                column: TENANT_COLUMN.to_string(),
            }
            .into());
        }

        tx.install_row_policy(&schema).await?;
        let registration = tx.upsert_registration(table, true).await?;
        info!(table = table, "Registered table");
        Ok(registration)
    }

    /// Marks a table unreachable. The table and its rows are untouched.
    pub async fn deactivate<T: StoreTransaction>(
        tx: &mut T,
        table: &str,
    ) -> StorageResult<TableRegistration> {
        if tx.find_registration(table).await?.is_none() {
            return Err(AccessError::NotExposed {
                table: table.to_string(),
            }
            .into());
        }
        let registration = tx.upsert_registration(table, false).await?;
        info!(table = table, "Deactivated table");
        Ok(registration)
    }

    /// Lists every registration, active or not.
    pub async fn list<T: StoreTransaction>(tx: &mut T) -> StorageResult<Vec<TableRegistration>> {
        tx.list_registrations().await
    }
}
