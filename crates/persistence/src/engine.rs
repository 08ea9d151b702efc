//! The generic CRUD engine.
//!
//! Every operation runs as one store transaction through the same fixed
//! sequence:
//!
//! ```text
//! registry check ──> bind tenant ──> introspect ──> sanitize ──> execute ──> audit ──> commit
//! ```
//!
//! Any failure along the way rolls the whole transaction back, so a
//! mutation and its audit record are always committed or discarded
//! together. The engine never filters by tenant itself: reads carry no
//! tenant predicate and writes address rows by id only. Which rows are
//! visible is decided by the store, keyed on the bound session variable.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::audit::{AuditLogger, record_id_of};
use crate::core::{Backend, StoreTransaction, TransactionProvider};
use crate::error::{AccessError, BackendError, StorageResult};
use crate::registry::TableRegistry;
use crate::sanitizer::{PayloadSanitizer, SanitizeMode};
use crate::schema::SchemaIntrospector;
use crate::tenant::{BoundTransaction, TenantContext, bind};
use crate::types::{
    AuditAction, AuditRecord, FieldValue, ID_COLUMN, Row, TENANT_COLUMN, TableRegistration,
    TableSchema, USER_COLUMN,
};

/// Acknowledgment of a successful delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    /// Always `"success"`.
    pub status: String,
    /// Human-readable confirmation.
    pub message: String,
    /// Id of the deleted row, as reported by the store.
    #[serde(skip)]
    pub record_id: String,
}

impl DeleteOutcome {
    fn new(record_id: String) -> Self {
        Self {
            status: "success".to_string(),
            message: format!("Record {} deleted.", record_id),
            record_id,
        }
    }
}

/// Executes create, read, update and delete against dynamically resolved tables.
pub struct CrudEngine<B> {
    backend: Arc<B>,
    sanitizer: PayloadSanitizer,
}

impl<B> Clone for CrudEngine<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            sanitizer: self.sanitizer.clone(),
        }
    }
}

impl<B: std::fmt::Debug> std::fmt::Debug for CrudEngine<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrudEngine")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl<B> CrudEngine<B>
where
    B: Backend + TransactionProvider + 'static,
{
    /// Creates an engine over a backend, with the standard protected field set.
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            sanitizer: PayloadSanitizer::default(),
        }
    }

    /// Replaces the payload sanitizer.
    pub fn with_sanitizer(mut self, sanitizer: PayloadSanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    /// Returns the backend.
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Returns the payload sanitizer.
    pub fn sanitizer(&self) -> &PayloadSanitizer {
        &self.sanitizer
    }

    /// Reads every row of `table` visible to the caller's tenant.
    #[instrument(skip(self, ctx), fields(tenant = %ctx.tenant_id()))]
    pub async fn list(&self, ctx: &TenantContext, table: &str) -> StorageResult<Vec<Row>> {
        let (mut tx, schema) = self.open(ctx, table).await?;
        let outcome = tx.transaction().select_rows(&schema).await;
        finish(tx, outcome).await
    }

    /// Inserts a row owned by the caller's tenant and returns it as stored.
    ///
    /// `tenant_id` is always the context's tenant and `user_id`, when the
    /// table has one, is always the context's user.
    #[instrument(skip(self, ctx, raw), fields(tenant = %ctx.tenant_id()))]
    pub async fn create(&self, ctx: &TenantContext, table: &str, raw: Value) -> StorageResult<Row> {
        let (mut tx, schema) = self.open(ctx, table).await?;
        let outcome = self.create_in(&mut tx, &schema, raw).await;
        finish(tx, outcome).await
    }

    /// Updates one row by id and returns it as stored.
    ///
    /// A row of another tenant and a row that does not exist both fail with
    /// `AccessError::NotFoundOrForbidden`.
    #[instrument(skip(self, ctx, raw), fields(tenant = %ctx.tenant_id()))]
    pub async fn update(
        &self,
        ctx: &TenantContext,
        table: &str,
        id: &str,
        raw: Value,
    ) -> StorageResult<Row> {
        let (mut tx, schema) = self.open(ctx, table).await?;
        let outcome = self.update_in(&mut tx, &schema, id, raw).await;
        finish(tx, outcome).await
    }

    /// Deletes one row by id.
    ///
    /// Same not-found semantics as [`update`](Self::update).
    #[instrument(skip(self, ctx), fields(tenant = %ctx.tenant_id()))]
    pub async fn delete(
        &self,
        ctx: &TenantContext,
        table: &str,
        id: &str,
    ) -> StorageResult<DeleteOutcome> {
        let (mut tx, schema) = self.open(ctx, table).await?;
        let outcome = self.delete_in(&mut tx, &schema, id).await;
        finish(tx, outcome).await
    }

    /// Reads the caller tenant's audit trail, newest first.
    #[instrument(skip(self, ctx), fields(tenant = %ctx.tenant_id()))]
    pub async fn audit_trail(&self, ctx: &TenantContext) -> StorageResult<Vec<AuditRecord>> {
        let tx = self.backend.begin_transaction().await?;
        let mut tx = bind(tx, ctx).await?;
        let tenant = ctx.tenant_id().clone();
        let outcome = tx.transaction().audit_records(&tenant).await;
        finish(tx, outcome).await
    }

    /// Adds a table to the allow-list and installs its row policy.
    pub async fn register_table(&self, table: &str) -> StorageResult<TableRegistration> {
        let mut tx = self.backend.begin_transaction().await?;
        let outcome = TableRegistry::register(&mut tx, table).await;
        settle(tx, outcome).await
    }

    /// Removes a table from the allow-list.
    pub async fn deactivate_table(&self, table: &str) -> StorageResult<TableRegistration> {
        let mut tx = self.backend.begin_transaction().await?;
        let outcome = TableRegistry::deactivate(&mut tx, table).await;
        settle(tx, outcome).await
    }

    /// Lists the allow-list.
    pub async fn registrations(&self) -> StorageResult<Vec<TableRegistration>> {
        let mut tx = self.backend.begin_transaction().await?;
        let outcome = TableRegistry::list(&mut tx).await;
        settle(tx, outcome).await
    }

    /// Returns `true` if `table` is registered and active.
    pub async fn is_reachable(&self, table: &str) -> StorageResult<bool> {
        let mut tx = self.backend.begin_transaction().await?;
        let outcome = TableRegistry::is_reachable(&mut tx, table).await;
        settle(tx, outcome).await
    }

    /// Checks that the store is reachable.
    pub async fn health_check(&self) -> Result<(), BackendError> {
        self.backend.health_check().await
    }

    /// Begins a transaction, checks the registry, binds the tenant and
    /// introspects the table, in that order.
    async fn open(
        &self,
        ctx: &TenantContext,
        table: &str,
    ) -> StorageResult<(BoundTransaction<B::Transaction>, TableSchema)> {
        let mut tx = self.backend.begin_transaction().await?;
        if let Err(e) = TableRegistry::ensure_reachable(&mut tx, table).await {
            discard(tx).await;
            return Err(e);
        }

        let mut tx = bind(tx, ctx).await?;
        match SchemaIntrospector::describe(tx.transaction(), table).await {
            Ok(schema) => Ok((tx, schema)),
            Err(e) => {
                tx.rollback().await;
                Err(e)
            }
        }
    }

    async fn create_in<T: StoreTransaction>(
        &self,
        tx: &mut BoundTransaction<T>,
        schema: &TableSchema,
        raw: Value,
    ) -> StorageResult<Row> {
        let mut payload = self.sanitizer.sanitize(schema, raw, SanitizeMode::Create)?;

        let context = tx.context().clone();
        payload.insert(
            TENANT_COLUMN,
            FieldValue::from(context.tenant_id().as_str()),
        );
        if schema.has_column(USER_COLUMN) {
            payload.insert(USER_COLUMN, FieldValue::from(context.user_id().as_str()));
        }

        let row = tx.transaction().insert_row(schema, &payload).await?;
        let record_id = record_id_of(&row);
        AuditLogger::record(
            tx,
            AuditAction::Create,
            schema.table_name(),
            &record_id,
            Some(&payload),
        )
        .await?;

        debug!(table = schema.table_name(), record_id = %record_id, "Created row");
        Ok(row)
    }

    async fn update_in<T: StoreTransaction>(
        &self,
        tx: &mut BoundTransaction<T>,
        schema: &TableSchema,
        id: &str,
        raw: Value,
    ) -> StorageResult<Row> {
        let mut payload = self.sanitizer.sanitize(schema, raw, SanitizeMode::Update)?;
        payload.remove(TENANT_COLUMN);

        if !schema.has_column(ID_COLUMN) {
            return Err(AccessError::NotFoundOrForbidden.into());
        }

        let row = if payload.is_empty() {
            tx.transaction().fetch_row(schema, id).await?
        } else {
            tx.transaction().update_row(schema, id, &payload).await?
        };
        let row = row.ok_or(AccessError::NotFoundOrForbidden)?;

        AuditLogger::record(
            tx,
            AuditAction::Update,
            schema.table_name(),
            id,
            Some(&payload),
        )
        .await?;

        debug!(table = schema.table_name(), record_id = id, "Updated row");
        Ok(row)
    }

    async fn delete_in<T: StoreTransaction>(
        &self,
        tx: &mut BoundTransaction<T>,
        schema: &TableSchema,
        id: &str,
    ) -> StorageResult<DeleteOutcome> {
        if !schema.has_column(ID_COLUMN) {
            return Err(AccessError::NotFoundOrForbidden.into());
        }

        let deleted = tx
            .transaction()
            .delete_row(schema, id)
            .await?
            .ok_or(AccessError::NotFoundOrForbidden)?;

        AuditLogger::record(tx, AuditAction::Delete, schema.table_name(), &deleted, None).await?;

        debug!(table = schema.table_name(), record_id = %deleted, "Deleted row");
        Ok(DeleteOutcome::new(deleted))
    }
}

/// Commits on success, rolls back on failure.
async fn finish<T: StoreTransaction, V>(
    tx: BoundTransaction<T>,
    outcome: StorageResult<V>,
) -> StorageResult<V> {
    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            tx.rollback().await;
            Err(e)
        }
    }
}

/// [`finish`] for transactions that never carried a tenant context.
async fn settle<T: StoreTransaction, V>(tx: T, outcome: StorageResult<V>) -> StorageResult<V> {
    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            discard(tx).await;
            Err(e)
        }
    }
}

async fn discard<T: StoreTransaction>(tx: T) {
    if let Err(e) = tx.rollback().await {
        warn!(error = %e, "Rollback failed; connection will be discarded");
    }
}
