//! Transaction traits.
//!
//! A [`StoreTransaction`] is one pooled connection holding one open store
//! transaction. It exposes the primitives the engine is built from; it has
//! no notion of tenants beyond the session variables it is asked to set,
//! and it never adds tenant predicates the store would not add itself.

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::tenant::TenantId;
use crate::types::{AuditRecord, Payload, Row, TableRegistration, TableSchema};

/// An open store transaction.
///
/// Dropping a transaction without calling [`commit`](Self::commit) or
/// [`rollback`](Self::rollback) discards its work, and its connection
/// never goes back to the pool with session state attached.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Sets a session variable visible only to the rest of this transaction.
    async fn set_session_variable(&mut self, name: &str, value: &str) -> StorageResult<()>;

    /// Looks up a table's registration.
    async fn find_registration(&mut self, table: &str) -> StorageResult<Option<TableRegistration>>;

    /// Creates or updates a table's registration.
    async fn upsert_registration(
        &mut self,
        table: &str,
        is_active: bool,
    ) -> StorageResult<TableRegistration>;

    /// Lists all registrations, ordered by table name.
    async fn list_registrations(&mut self) -> StorageResult<Vec<TableRegistration>>;

    /// Introspects a table from the live schema. `None` if it does not exist.
    async fn describe_table(&mut self, table: &str) -> StorageResult<Option<TableSchema>>;

    /// Installs the store's tenant row policy on a table, if not already present.
    async fn install_row_policy(&mut self, schema: &TableSchema) -> StorageResult<()>;

    /// Selects every row the store lets this transaction see.
    async fn select_rows(&mut self, schema: &TableSchema) -> StorageResult<Vec<Row>>;

    /// Fetches one visible row by id.
    async fn fetch_row(&mut self, schema: &TableSchema, id: &str) -> StorageResult<Option<Row>>;

    /// Inserts a row and returns it as stored.
    async fn insert_row(&mut self, schema: &TableSchema, payload: &Payload) -> StorageResult<Row>;

    /// Updates a visible row by id. `None` if no row matched.
    async fn update_row(
        &mut self,
        schema: &TableSchema,
        id: &str,
        payload: &Payload,
    ) -> StorageResult<Option<Row>>;

    /// Deletes a visible row by id, returning its id. `None` if no row matched.
    async fn delete_row(&mut self, schema: &TableSchema, id: &str) -> StorageResult<Option<String>>;

    /// Appends a record to the audit ledger.
    async fn insert_audit(&mut self, record: &AuditRecord) -> StorageResult<()>;

    /// Reads a tenant's audit records, newest first.
    async fn audit_records(&mut self, tenant: &TenantId) -> StorageResult<Vec<AuditRecord>>;

    /// Commits the transaction.
    async fn commit(self) -> StorageResult<()>;

    /// Rolls back the transaction.
    async fn rollback(self) -> StorageResult<()>;
}

/// Provider for transactions.
///
/// Each call hands out a fresh connection with a fresh transaction; no
/// state from a previous transaction is visible.
#[async_trait]
pub trait TransactionProvider: Send + Sync {
    /// The transaction type returned by this provider.
    type Transaction: StoreTransaction + 'static;

    /// Begins a new transaction.
    ///
    /// # Errors
    ///
    /// * `StorageError::Backend` - If a connection cannot be acquired
    /// * `StorageError::Transaction` - If the transaction cannot be started
    async fn begin_transaction(&self) -> StorageResult<Self::Transaction>;
}
