//! Transaction support for PostgreSQL backend.
//!
//! Dynamic statements never interpolate values. Identifiers are validated
//! and quoted; the payload travels as a single JSONB parameter that is
//! expanded with `jsonb_populate_record`, so every value is converted to
//! its column type by PostgreSQL itself. Rows come back as `to_jsonb(t.*)`.

use async_trait::async_trait;
use deadpool_postgres::Client;
use serde_json::Value;
use uuid::Uuid;

use crate::core::{StoreTransaction, TransactionProvider};
use crate::error::{BackendError, StorageError, StorageResult, TransactionError};
use crate::schema::quote_identifier;
use crate::tenant::{TENANT_SETTING, TenantId, UserId};
use crate::types::{
    AuditRecord, ColumnDescriptor, ID_COLUMN, Payload, Row, TENANT_COLUMN, TableRegistration,
    TableSchema,
};

use super::PostgresBackend;

/// Name of the row policy installed on registered tables.
pub const ROW_POLICY_NAME: &str = "tenant_isolation";

fn serialization_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::SerializationError { message })
}

fn into_row(value: Value) -> StorageResult<Row> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(serialization_error(format!(
            "expected a row object, got {}",
            other
        ))),
    }
}

fn select_sql(schema: &TableSchema) -> String {
    format!(
        "SELECT to_jsonb(t.*) FROM {} AS t",
        quote_identifier(schema.table_name())
    )
}

fn fetch_sql(schema: &TableSchema) -> String {
    format!(
        "SELECT to_jsonb(t.*) FROM {} AS t WHERE t.{}::text = $1",
        quote_identifier(schema.table_name()),
        quote_identifier(ID_COLUMN)
    )
}

fn insert_sql(schema: &TableSchema, payload: &Payload) -> String {
    let table = quote_identifier(schema.table_name());
    if payload.is_empty() {
        return format!("INSERT INTO {} AS t DEFAULT VALUES RETURNING to_jsonb(t.*)", table);
    }

    let columns: Vec<String> = payload.columns().map(quote_identifier).collect();
    let sources: Vec<String> = columns.iter().map(|c| format!("src.{}", c)).collect();
    format!(
        "INSERT INTO {table} AS t ({}) SELECT {} FROM jsonb_populate_record(NULL::{table}, $1::jsonb) AS src RETURNING to_jsonb(t.*)",
        columns.join(", "),
        sources.join(", "),
    )
}

fn update_sql(schema: &TableSchema, payload: &Payload) -> String {
    let table = quote_identifier(schema.table_name());
    let assignments: Vec<String> = payload
        .columns()
        .map(quote_identifier)
        .map(|c| format!("{c} = src.{c}"))
        .collect();
    format!(
        "UPDATE {table} AS t SET {} FROM jsonb_populate_record(NULL::{table}, $1::jsonb) AS src WHERE t.{}::text = $2 RETURNING to_jsonb(t.*)",
        assignments.join(", "),
        quote_identifier(ID_COLUMN),
    )
}

fn delete_sql(schema: &TableSchema) -> String {
    let id = quote_identifier(ID_COLUMN);
    format!(
        "DELETE FROM {} AS t WHERE t.{id}::text = $1 RETURNING t.{id}::text",
        quote_identifier(schema.table_name()),
    )
}

/// Statements enabling, forcing and defining the tenant row policy.
///
/// `FORCE` makes the policy apply to the table owner as well.
fn row_policy_sql(schema: &TableSchema) -> Vec<String> {
    let table = quote_identifier(schema.table_name());
    let predicate = format!(
        "{}::text = current_setting('{}')",
        quote_identifier(TENANT_COLUMN),
        TENANT_SETTING
    );
    vec![
        format!("ALTER TABLE {} ENABLE ROW LEVEL SECURITY", table),
        format!("ALTER TABLE {} FORCE ROW LEVEL SECURITY", table),
        format!(
            "CREATE POLICY {} ON {} USING ({}) WITH CHECK ({})",
            ROW_POLICY_NAME, table, predicate, predicate
        ),
    ]
}

fn registration_from_row(row: &tokio_postgres::Row) -> StorageResult<TableRegistration> {
    Ok(TableRegistration {
        id: row.try_get(0)?,
        table_name: row.try_get(1)?,
        is_active: row.try_get(2)?,
        created_at: row.try_get(3)?,
    })
}

/// A PostgreSQL transaction.
///
/// Wraps a pooled client with an open transaction. A transaction dropped
/// while still active detaches its client from the pool, so the
/// connection, together with its transaction and session variables, is
/// closed rather than reused.
pub struct PostgresTransaction {
    /// The client with active transaction.
    /// Option so we can take it during commit/rollback.
    client: Option<Client>,
    /// Whether the transaction is still active.
    active: bool,
}

impl std::fmt::Debug for PostgresTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresTransaction")
            .field("active", &self.active)
            .finish()
    }
}

impl PostgresTransaction {
    /// Create a new transaction.
    async fn new(client: Client) -> StorageResult<Self> {
        client.batch_execute("BEGIN").await.map_err(|e| {
            StorageError::Transaction(TransactionError::RolledBack {
                reason: format!("Failed to begin transaction: {}", e),
            })
        })?;

        Ok(Self {
            client: Some(client),
            active: true,
        })
    }

    fn client(&self) -> StorageResult<&Client> {
        match (&self.client, self.active) {
            (Some(client), true) => Ok(client),
            _ => Err(StorageError::Transaction(TransactionError::InvalidTransaction)),
        }
    }

    async fn finish(mut self, statement: &str) -> StorageResult<()> {
        let client = self
            .client
            .take()
            .filter(|_| self.active)
            .ok_or(StorageError::Transaction(TransactionError::InvalidTransaction))?;
        self.active = false;

        client.batch_execute(statement).await.map_err(|e| {
            StorageError::Transaction(TransactionError::RolledBack {
                reason: format!("{} failed: {}", statement, e),
            })
        })
    }
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn set_session_variable(&mut self, name: &str, value: &str) -> StorageResult<()> {
        self.client()?
            .query_one("SELECT set_config($1, $2, true)", &[&name, &value])
            .await?;
        Ok(())
    }

    async fn find_registration(&mut self, table: &str) -> StorageResult<Option<TableRegistration>> {
        let row = self
            .client()?
            .query_opt(
                "SELECT id, table_name, is_active, created_at FROM tables_meta
                 WHERE table_name = $1",
                &[&table],
            )
            .await?;
        row.as_ref().map(registration_from_row).transpose()
    }

    async fn upsert_registration(
        &mut self,
        table: &str,
        is_active: bool,
    ) -> StorageResult<TableRegistration> {
        let id = Uuid::new_v4().to_string();
        let row = self
            .client()?
            .query_one(
                "INSERT INTO tables_meta (id, table_name, is_active)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (table_name) DO UPDATE SET is_active = EXCLUDED.is_active
                 RETURNING id, table_name, is_active, created_at",
                &[&id, &table, &is_active],
            )
            .await?;
        registration_from_row(&row)
    }

    async fn list_registrations(&mut self) -> StorageResult<Vec<TableRegistration>> {
        let rows = self
            .client()?
            .query(
                "SELECT id, table_name, is_active, created_at FROM tables_meta
                 ORDER BY table_name",
                &[],
            )
            .await?;
        rows.iter().map(registration_from_row).collect()
    }

    async fn describe_table(&mut self, table: &str) -> StorageResult<Option<TableSchema>> {
        let rows = self
            .client()?
            .query(
                "SELECT column_name::text, data_type::text, is_nullable::text = 'YES'
                 FROM information_schema.columns
                 WHERE table_schema = current_schema() AND table_name::text = $1
                 ORDER BY ordinal_position",
                &[&table],
            )
            .await?;

        if rows.is_empty() {
            return Ok(None);
        }

        let columns = rows
            .iter()
            .map(|row| {
                Ok(ColumnDescriptor::new(
                    row.try_get::<_, String>(0)?,
                    row.try_get::<_, String>(1)?,
                    row.try_get::<_, bool>(2)?,
                ))
            })
            .collect::<StorageResult<Vec<_>>>()?;
        Ok(Some(TableSchema::new(table, columns)))
    }

    async fn install_row_policy(&mut self, schema: &TableSchema) -> StorageResult<()> {
        let client = self.client()?;
        let existing = client
            .query_opt(
                "SELECT 1 FROM pg_policies
                 WHERE schemaname::text = current_schema()
                   AND tablename::text = $1
                   AND policyname::text = $2",
                &[&schema.table_name(), &ROW_POLICY_NAME],
            )
            .await?;
        if existing.is_some() {
            tracing::debug!(table = schema.table_name(), "Row policy already installed");
            return Ok(());
        }

        for statement in row_policy_sql(schema) {
            client.batch_execute(&statement).await?;
        }
        tracing::info!(table = schema.table_name(), "Installed tenant row policy");
        Ok(())
    }

    async fn select_rows(&mut self, schema: &TableSchema) -> StorageResult<Vec<Row>> {
        let rows = self.client()?.query(&select_sql(schema), &[]).await?;
        rows.iter()
            .map(|row| into_row(row.try_get::<_, Value>(0)?))
            .collect()
    }

    async fn fetch_row(&mut self, schema: &TableSchema, id: &str) -> StorageResult<Option<Row>> {
        let row = self
            .client()?
            .query_opt(&fetch_sql(schema), &[&id])
            .await?;
        row.map(|row| into_row(row.try_get::<_, Value>(0)?))
            .transpose()
    }

    async fn insert_row(&mut self, schema: &TableSchema, payload: &Payload) -> StorageResult<Row> {
        let sql = insert_sql(schema, payload);
        let client = self.client()?;
        let row = if payload.is_empty() {
            client.query_one(&sql, &[]).await?
        } else {
            client.query_one(&sql, &[&payload.to_json()]).await?
        };
        into_row(row.try_get::<_, Value>(0)?)
    }

    async fn update_row(
        &mut self,
        schema: &TableSchema,
        id: &str,
        payload: &Payload,
    ) -> StorageResult<Option<Row>> {
        if payload.is_empty() {
            return self.fetch_row(schema, id).await;
        }

        let row = self
            .client()?
            .query_opt(&update_sql(schema, payload), &[&payload.to_json(), &id])
            .await?;
        row.map(|row| into_row(row.try_get::<_, Value>(0)?))
            .transpose()
    }

    async fn delete_row(&mut self, schema: &TableSchema, id: &str) -> StorageResult<Option<String>> {
        let row = self
            .client()?
            .query_opt(&delete_sql(schema), &[&id])
            .await?;
        Ok(row.map(|row| row.try_get::<_, String>(0)).transpose()?)
    }

    async fn insert_audit(&mut self, record: &AuditRecord) -> StorageResult<()> {
        self.client()?
            .execute(
                "INSERT INTO audit_logs
                    (id, tenant_id, user_id, action, table_name, record_id, payload, timestamp)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                &[
                    &record.id,
                    &record.tenant_id.as_str(),
                    &record.user_id.as_str(),
                    &record.action.as_str(),
                    &record.table_name,
                    &record.record_id,
                    &record.payload,
                    &record.timestamp,
                ],
            )
            .await?;
        Ok(())
    }

    async fn audit_records(&mut self, tenant: &TenantId) -> StorageResult<Vec<AuditRecord>> {
        let rows = self
            .client()?
            .query(
                "SELECT id, tenant_id, user_id, action, table_name, record_id, payload, timestamp
                 FROM audit_logs
                 WHERE tenant_id = $1
                 ORDER BY timestamp DESC",
                &[&tenant.as_str()],
            )
            .await?;

        rows.iter()
            .map(|row| {
                let action: String = row.try_get(3)?;
                Ok(AuditRecord {
                    id: row.try_get(0)?,
                    tenant_id: TenantId::new(row.try_get::<_, String>(1)?),
                    user_id: UserId::new(row.try_get::<_, String>(2)?),
                    action: action.parse().map_err(serialization_error)?,
                    table_name: row.try_get(4)?,
                    record_id: row.try_get(5)?,
                    payload: row.try_get(6)?,
                    timestamp: row.try_get(7)?,
                })
            })
            .collect()
    }

    async fn commit(self) -> StorageResult<()> {
        self.finish("COMMIT").await
    }

    async fn rollback(self) -> StorageResult<()> {
        self.finish("ROLLBACK").await
    }
}

impl Drop for PostgresTransaction {
    fn drop(&mut self) {
        if self.active {
            if let Some(client) = self.client.take() {
                tracing::warn!(
                    "PostgreSQL transaction dropped without commit or rollback; closing connection"
                );
                drop(Client::take(client));
            }
        }
    }
}

#[async_trait]
impl TransactionProvider for PostgresBackend {
    type Transaction = PostgresTransaction;

    async fn begin_transaction(&self) -> StorageResult<Self::Transaction> {
        let client = self.get_client().await?;
        PostgresTransaction::new(client).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn notes() -> TableSchema {
        TableSchema::new(
            "notes",
            vec![
                ColumnDescriptor::new("id", "uuid", false),
                ColumnDescriptor::new("tenant_id", "text", false),
                ColumnDescriptor::new("title", "text", true),
            ],
        )
    }

    fn payload(value: Value) -> Payload {
        Payload::from_json(value).unwrap()
    }

    #[test]
    fn test_select_has_no_tenant_predicate() {
        let sql = select_sql(&notes());
        assert_eq!(sql, "SELECT to_jsonb(t.*) FROM \"notes\" AS t");
        assert!(!sql.contains("tenant_id"));
    }

    #[test]
    fn test_insert_sql() {
        let sql = insert_sql(
            &notes(),
            &payload(json!({"title": "a", "tenant_id": "T1"})),
        );
        assert_eq!(
            sql,
            "INSERT INTO \"notes\" AS t (\"tenant_id\", \"title\") \
             SELECT src.\"tenant_id\", src.\"title\" \
             FROM jsonb_populate_record(NULL::\"notes\", $1::jsonb) AS src \
             RETURNING to_jsonb(t.*)"
        );
    }

    #[test]
    fn test_insert_default_values() {
        let sql = insert_sql(&notes(), &Payload::new());
        assert!(sql.contains("DEFAULT VALUES"));
    }

    #[test]
    fn test_update_sql_filters_by_id_only() {
        let sql = update_sql(&notes(), &payload(json!({"title": "b"})));
        assert_eq!(
            sql,
            "UPDATE \"notes\" AS t SET \"title\" = src.\"title\" \
             FROM jsonb_populate_record(NULL::\"notes\", $1::jsonb) AS src \
             WHERE t.\"id\"::text = $2 RETURNING to_jsonb(t.*)"
        );
    }

    #[test]
    fn test_delete_sql() {
        assert_eq!(
            delete_sql(&notes()),
            "DELETE FROM \"notes\" AS t WHERE t.\"id\"::text = $1 RETURNING t.\"id\"::text"
        );
    }

    #[test]
    fn test_fetch_sql() {
        assert!(fetch_sql(&notes()).ends_with("WHERE t.\"id\"::text = $1"));
    }

    #[test]
    fn test_row_policy_sql() {
        let statements = row_policy_sql(&notes());
        assert_eq!(statements.len(), 3);
        assert_eq!(
            statements[0],
            "ALTER TABLE \"notes\" ENABLE ROW LEVEL SECURITY"
        );
        assert_eq!(statements[1], "ALTER TABLE \"notes\" FORCE ROW LEVEL SECURITY");
        assert!(statements[2].starts_with("CREATE POLICY tenant_isolation ON \"notes\""));
        assert!(
            statements[2]
                .contains("USING (\"tenant_id\"::text = current_setting('app.current_tenant'))")
        );
        assert!(statements[2].contains("WITH CHECK"));
    }

    #[test]
    fn test_into_row_rejects_non_objects() {
        assert!(into_row(json!({"id": 1})).is_ok());
        assert!(into_row(json!([1])).is_err());
    }
}
