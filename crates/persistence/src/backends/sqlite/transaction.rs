//! Transaction support for SQLite backend.
//!
//! SQLite has neither session variables nor row-level security, so this
//! transaction emulates both. Session variables live in the transaction
//! and disappear with it. Every statement against a table with a
//! `tenant_id` column is confined to the bound `app.current_tenant`, and
//! fails with `SecurityContextMissing` when nothing is bound, exactly as
//! the PostgreSQL policy would.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{OptionalExtension, params, params_from_iter};
use serde_json::{Number, Value};
use uuid::Uuid;

use crate::core::{StoreTransaction, TransactionProvider};
use crate::error::{
    AccessError, BackendError, StorageError, StorageResult, TransactionError,
};
use crate::schema::quote_identifier;
use crate::tenant::{TENANT_SETTING, TenantId, UserId};
use crate::types::{
    AuditRecord, ColumnDescriptor, FieldValue, ID_COLUMN, Payload, Row, TENANT_COLUMN,
    TableRegistration, TableSchema,
};

use super::SqliteBackend;

fn internal_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::Internal {
        backend_name: "sqlite".to_string(),
        message,
        source: None,
    })
}

fn serialization_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::SerializationError { message })
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| serialization_error(format!("invalid timestamp '{}': {}", raw, e)))
}

/// Converts a payload value to an SQLite value.
pub(crate) fn to_sql(value: &FieldValue) -> SqlValue {
    match value {
        FieldValue::Null => SqlValue::Null,
        FieldValue::Bool(b) => SqlValue::Integer(i64::from(*b)),
        FieldValue::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n
                .as_f64()
                .map(SqlValue::Real)
                .unwrap_or_else(|| SqlValue::Text(n.to_string())),
        },
        FieldValue::String(s) => SqlValue::Text(s.clone()),
        FieldValue::Structured(v) => SqlValue::Text(v.to_string()),
    }
}

/// Converts an SQLite column value to JSON.
pub(crate) fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Number(i.into()),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Array(b.iter().map(|byte| Value::from(*byte)).collect()),
    }
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Row> {
    let stmt = row.as_ref();
    let mut out = Row::new();
    for index in 0..stmt.column_count() {
        let name = stmt.column_name(index)?.to_string();
        out.insert(name, to_json(row.get_ref(index)?));
    }
    Ok(out)
}

fn read_registration(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, bool, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn into_registration(raw: (String, String, bool, String)) -> StorageResult<TableRegistration> {
    let (id, table_name, is_active, created_at) = raw;
    Ok(TableRegistration {
        id,
        table_name,
        is_active,
        created_at: parse_timestamp(&created_at)?,
    })
}

/// A SQLite transaction.
pub struct SqliteTransaction {
    /// The connection used for this transaction.
    conn: PooledConnection<SqliteConnectionManager>,
    /// Whether the transaction is still active.
    active: bool,
    /// Emulated transaction-local session variables.
    settings: HashMap<String, String>,
}

impl std::fmt::Debug for SqliteTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteTransaction")
            .field("active", &self.active)
            .field("settings", &self.settings)
            .finish()
    }
}

impl SqliteTransaction {
    /// Create a new transaction.
    fn new(conn: PooledConnection<SqliteConnectionManager>) -> StorageResult<Self> {
        conn.execute("BEGIN IMMEDIATE", []).map_err(|e| {
            StorageError::Transaction(TransactionError::RolledBack {
                reason: format!("Failed to begin transaction: {}", e),
            })
        })?;

        Ok(Self {
            conn,
            active: true,
            settings: HashMap::new(),
        })
    }

    fn ensure_active(&self) -> StorageResult<()> {
        if self.active {
            Ok(())
        } else {
            Err(StorageError::Transaction(TransactionError::InvalidTransaction))
        }
    }

    /// The tenant a statement against `schema` is confined to.
    ///
    /// `None` for tables without a tenant column; an error when the table
    /// is tenant-scoped but no tenant is bound.
    fn tenant_scope(&self, schema: &TableSchema) -> StorageResult<Option<String>> {
        if !schema.is_tenant_scoped() {
            return Ok(None);
        }
        match self.settings.get(TENANT_SETTING) {
            Some(tenant) if !tenant.is_empty() => Ok(Some(tenant.clone())),
            _ => Err(AccessError::SecurityContextMissing.into()),
        }
    }

    /// Rejects writes that would place a row outside the bound tenant.
    fn check_tenant_write(scope: Option<&str>, payload: &Payload) -> StorageResult<()> {
        match (scope, payload.get(TENANT_COLUMN)) {
            (Some(tenant), Some(value)) if value.as_str() != Some(tenant) => {
                Err(AccessError::SecurityContextMissing.into())
            }
            _ => Ok(()),
        }
    }

    fn id_predicate(scope: Option<&str>, first_param: usize) -> String {
        let id = quote_identifier(ID_COLUMN);
        match scope {
            Some(_) => format!(
                "CAST({} AS TEXT) = ?{} AND {} = ?{}",
                id,
                first_param,
                quote_identifier(TENANT_COLUMN),
                first_param + 1
            ),
            None => format!("CAST({} AS TEXT) = ?{}", id, first_param),
        }
    }
}

#[async_trait]
impl StoreTransaction for SqliteTransaction {
    async fn set_session_variable(&mut self, name: &str, value: &str) -> StorageResult<()> {
        self.ensure_active()?;
        self.settings.insert(name.to_string(), value.to_string());
        Ok(())
    }

    async fn find_registration(&mut self, table: &str) -> StorageResult<Option<TableRegistration>> {
        self.ensure_active()?;
        let raw = self
            .conn
            .query_row(
                "SELECT id, table_name, is_active, created_at FROM tables_meta
                 WHERE table_name = ?1",
                params![table],
                read_registration,
            )
            .optional()?;
        raw.map(into_registration).transpose()
    }

    async fn upsert_registration(
        &mut self,
        table: &str,
        is_active: bool,
    ) -> StorageResult<TableRegistration> {
        self.ensure_active()?;
        let raw = self.conn.query_row(
            "INSERT INTO tables_meta (id, table_name, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(table_name) DO UPDATE SET is_active = excluded.is_active
             RETURNING id, table_name, is_active, created_at",
            params![
                Uuid::new_v4().to_string(),
                table,
                is_active,
                timestamp(&Utc::now())
            ],
            read_registration,
        )?;
        into_registration(raw)
    }

    async fn list_registrations(&mut self) -> StorageResult<Vec<TableRegistration>> {
        self.ensure_active()?;
        let mut stmt = self.conn.prepare(
            "SELECT id, table_name, is_active, created_at FROM tables_meta ORDER BY table_name",
        )?;
        let raw = stmt
            .query_map([], read_registration)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raw.into_iter().map(into_registration).collect()
    }

    async fn describe_table(&mut self, table: &str) -> StorageResult<Option<TableSchema>> {
        self.ensure_active()?;
        let mut stmt = self
            .conn
            .prepare("SELECT name, type, \"notnull\" FROM pragma_table_info(?1) ORDER BY cid")?;
        let columns = stmt
            .query_map(params![table], |row| {
                let not_null: bool = row.get(2)?;
                Ok(ColumnDescriptor::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    !not_null,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        if columns.is_empty() {
            return Ok(None);
        }
        Ok(Some(TableSchema::new(table, columns)))
    }

    async fn install_row_policy(&mut self, schema: &TableSchema) -> StorageResult<()> {
        self.ensure_active()?;
        tracing::debug!(
            table = schema.table_name(),
            "SQLite enforces tenant scope per statement; no policy to install"
        );
        Ok(())
    }

    async fn select_rows(&mut self, schema: &TableSchema) -> StorageResult<Vec<Row>> {
        self.ensure_active()?;
        let scope = self.tenant_scope(schema)?;
        let table = quote_identifier(schema.table_name());

        let (sql, params) = match scope {
            Some(tenant) => (
                format!(
                    "SELECT * FROM {} WHERE {} = ?1",
                    table,
                    quote_identifier(TENANT_COLUMN)
                ),
                vec![SqlValue::Text(tenant)],
            ),
            None => (format!("SELECT * FROM {}", table), Vec::new()),
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(params), read_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    async fn fetch_row(&mut self, schema: &TableSchema, id: &str) -> StorageResult<Option<Row>> {
        self.ensure_active()?;
        let scope = self.tenant_scope(schema)?;

        let sql = format!(
            "SELECT * FROM {} WHERE {}",
            quote_identifier(schema.table_name()),
            Self::id_predicate(scope.as_deref(), 1)
        );
        let mut params = vec![SqlValue::Text(id.to_string())];
        params.extend(scope.map(SqlValue::Text));

        let row = self
            .conn
            .query_row(&sql, params_from_iter(params), read_row)
            .optional()?;
        Ok(row)
    }

    async fn insert_row(&mut self, schema: &TableSchema, payload: &Payload) -> StorageResult<Row> {
        self.ensure_active()?;
        let scope = self.tenant_scope(schema)?;
        Self::check_tenant_write(scope.as_deref(), payload)?;
        if scope.is_some() && !payload.contains(TENANT_COLUMN) {
            return Err(AccessError::SecurityContextMissing.into());
        }

        let table = quote_identifier(schema.table_name());
        let sql = if payload.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES RETURNING *", table)
        } else {
            let columns: Vec<String> = payload.columns().map(quote_identifier).collect();
            let placeholders: Vec<String> = (1..=payload.len()).map(|i| format!("?{}", i)).collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
                table,
                columns.join(", "),
                placeholders.join(", ")
            )
        };
        let params: Vec<SqlValue> = payload.iter().map(|(_, value)| to_sql(value)).collect();

        let row = self
            .conn
            .query_row(&sql, params_from_iter(params), read_row)?;
        Ok(row)
    }

    async fn update_row(
        &mut self,
        schema: &TableSchema,
        id: &str,
        payload: &Payload,
    ) -> StorageResult<Option<Row>> {
        self.ensure_active()?;
        if payload.is_empty() {
            return self.fetch_row(schema, id).await;
        }

        let scope = self.tenant_scope(schema)?;
        Self::check_tenant_write(scope.as_deref(), payload)?;

        let assignments: Vec<String> = payload
            .columns()
            .enumerate()
            .map(|(i, column)| format!("{} = ?{}", quote_identifier(column), i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {} RETURNING *",
            quote_identifier(schema.table_name()),
            assignments.join(", "),
            Self::id_predicate(scope.as_deref(), payload.len() + 1)
        );

        let mut params: Vec<SqlValue> = payload.iter().map(|(_, value)| to_sql(value)).collect();
        params.push(SqlValue::Text(id.to_string()));
        params.extend(scope.map(SqlValue::Text));

        let row = self
            .conn
            .query_row(&sql, params_from_iter(params), read_row)
            .optional()?;
        Ok(row)
    }

    async fn delete_row(&mut self, schema: &TableSchema, id: &str) -> StorageResult<Option<String>> {
        self.ensure_active()?;
        let scope = self.tenant_scope(schema)?;

        let sql = format!(
            "DELETE FROM {} WHERE {} RETURNING CAST({} AS TEXT)",
            quote_identifier(schema.table_name()),
            Self::id_predicate(scope.as_deref(), 1),
            quote_identifier(ID_COLUMN)
        );
        let mut params = vec![SqlValue::Text(id.to_string())];
        params.extend(scope.map(SqlValue::Text));

        let deleted = self
            .conn
            .query_row(&sql, params_from_iter(params), |row| row.get::<_, String>(0))
            .optional()?;
        Ok(deleted)
    }

    async fn insert_audit(&mut self, record: &AuditRecord) -> StorageResult<()> {
        self.ensure_active()?;
        let payload = record
            .payload
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn.execute(
            "INSERT INTO audit_logs
                (id, tenant_id, user_id, action, table_name, record_id, payload, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.id.to_string(),
                record.tenant_id.as_str(),
                record.user_id.as_str(),
                record.action.as_str(),
                record.table_name,
                record.record_id,
                payload,
                timestamp(&record.timestamp)
            ],
        )?;
        Ok(())
    }

    async fn audit_records(&mut self, tenant: &TenantId) -> StorageResult<Vec<AuditRecord>> {
        self.ensure_active()?;
        let mut stmt = self.conn.prepare(
            "SELECT id, tenant_id, user_id, action, table_name, record_id, payload, timestamp
             FROM audit_logs
             WHERE tenant_id = ?1
             ORDER BY timestamp DESC, rowid DESC",
        )?;

        type RawAudit = (
            String,
            String,
            String,
            String,
            String,
            String,
            Option<String>,
            String,
        );
        let raw: Vec<RawAudit> = stmt
            .query_map(params![tenant.as_str()], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw.into_iter()
            .map(
                |(id, tenant_id, user_id, action, table_name, record_id, payload, at)| {
                    Ok(AuditRecord {
                        id: Uuid::parse_str(&id)
                            .map_err(|e| serialization_error(format!("invalid audit id: {}", e)))?,
                        tenant_id: TenantId::new(tenant_id),
                        user_id: UserId::new(user_id),
                        action: action.parse().map_err(serialization_error)?,
                        table_name,
                        record_id,
                        payload: payload
                            .map(|raw| serde_json::from_str::<Value>(&raw))
                            .transpose()?,
                        timestamp: parse_timestamp(&at)?,
                    })
                },
            )
            .collect()
    }

    async fn commit(mut self) -> StorageResult<()> {
        self.ensure_active()?;
        self.active = false;
        self.conn.execute("COMMIT", []).map_err(|e| {
            // A failed COMMIT leaves the transaction open
            let _ = self.conn.execute("ROLLBACK", []);
            StorageError::Transaction(TransactionError::RolledBack {
                reason: format!("Commit failed: {}", e),
            })
        })?;
        Ok(())
    }

    async fn rollback(mut self) -> StorageResult<()> {
        self.ensure_active()?;
        self.active = false;
        self.conn.execute("ROLLBACK", []).map_err(|e| {
            internal_error(format!("Rollback failed: {}", e))
        })?;
        Ok(())
    }
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        // If transaction wasn't explicitly committed or rolled back, roll it back
        if self.active {
            tracing::warn!("SQLite transaction dropped without commit or rollback; rolling back");
            let _ = self.conn.execute("ROLLBACK", []);
        }
    }
}

#[async_trait]
impl TransactionProvider for SqliteBackend {
    type Transaction = SqliteTransaction;

    async fn begin_transaction(&self) -> StorageResult<Self::Transaction> {
        let conn = self.get_connection()?;
        SqliteTransaction::new(conn)
    }
}
