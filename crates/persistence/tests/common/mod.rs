//! Shared fixtures for the persistence integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use novabase_persistence::backends::sqlite::SqliteBackend;
use novabase_persistence::engine::CrudEngine;
use novabase_persistence::tenant::{Role, TenantContext, TenantId, UserId};

/// Tenant-scoped table with an integer key and no owner column.
pub const NOTES_DDL: &str = "CREATE TABLE notes (
    id INTEGER PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    title TEXT,
    body TEXT
)";

/// Tenant-scoped table carrying an owner column and a unique constraint.
pub const PROJECTS_DDL: &str = "CREATE TABLE projects (
    id INTEGER PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    user_id TEXT,
    name TEXT NOT NULL,
    UNIQUE (tenant_id, name)
)";

/// A physical table that is never registered.
pub const HIDDEN_DDL: &str = "CREATE TABLE hidden (
    id INTEGER PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    secret TEXT
)";

/// A table without a tenant column.
pub const LOOKUP_DDL: &str = "CREATE TABLE lookup (code TEXT PRIMARY KEY, label TEXT)";

/// Makes every audit write fail after the mutation itself succeeded.
pub const BLOCK_AUDIT_DDL: &str = "CREATE TRIGGER block_audit BEFORE INSERT ON audit_logs
BEGIN
    SELECT RAISE(ABORT, 'audit ledger unavailable');
END";

pub fn create_backend() -> SqliteBackend {
    let backend = SqliteBackend::in_memory().expect("Failed to create SQLite backend");
    backend.init_schema().expect("Failed to initialize schema");
    for ddl in [NOTES_DDL, PROJECTS_DDL, HIDDEN_DDL, LOOKUP_DDL] {
        backend.execute_batch(ddl).expect("Failed to create fixture table");
    }
    backend
}

/// An engine with `notes` and `projects` registered.
pub async fn create_engine() -> CrudEngine<SqliteBackend> {
    let engine = CrudEngine::new(Arc::new(create_backend()));
    engine
        .register_table("notes")
        .await
        .expect("Failed to register notes");
    engine
        .register_table("projects")
        .await
        .expect("Failed to register projects");
    engine
}

pub fn create_tenant(tenant: &str, user: &str) -> TenantContext {
    TenantContext::new(TenantId::new(tenant), UserId::new(user), Role::Developer)
}

/// Tenant `T1`, user `U1`.
pub fn tenant_one() -> TenantContext {
    create_tenant("T1", "U1")
}

/// Tenant `T2`, user `U2`.
pub fn tenant_two() -> TenantContext {
    create_tenant("T2", "U2")
}

/// The stored id of a row as the string used in paths.
pub fn id_of(row: &serde_json::Map<String, serde_json::Value>) -> String {
    match &row["id"] {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
