//! Common test utilities for REST API testing.

#![allow(dead_code)]

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, header};
use axum_test::{TestRequest, TestServer};
use novabase_persistence::backends::sqlite::SqliteBackend;
use novabase_persistence::engine::CrudEngine;
use novabase_rest::{AppState, IdentityClaims, ServerConfig, app_from_state, issue_token};

/// Secret used by [`ServerConfig::for_testing`].
pub const TEST_SECRET: &[u8] = b"test-secret";

pub const NOTES_DDL: &str = "CREATE TABLE notes (
    id INTEGER PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    title TEXT
)";

/// Exists physically but is never registered.
pub const GHOST_DDL: &str = "CREATE TABLE ghost_table (
    id INTEGER PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    secret TEXT
)";

/// Makes every audit insert fail.
pub const BLOCK_AUDIT_DDL: &str = "CREATE TRIGGER block_audit BEFORE INSERT ON audit_logs
BEGIN
    SELECT RAISE(ABORT, 'audit ledger unavailable');
END";

/// A running API with `notes` registered.
pub struct TestApp {
    pub server: TestServer,
    pub engine: CrudEngine<SqliteBackend>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(ServerConfig::for_testing()).await
    }

    pub async fn with_config(config: ServerConfig) -> Self {
        let backend = SqliteBackend::in_memory().expect("Failed to create SQLite backend");
        backend.init_schema().expect("Failed to init schema");
        backend
            .execute_batch(NOTES_DDL)
            .expect("Failed to create notes");
        backend
            .execute_batch(GHOST_DDL)
            .expect("Failed to create ghost_table");

        let state = AppState::new(Arc::new(backend), config);
        state
            .engine()
            .register_table("notes")
            .await
            .expect("Failed to register notes");

        let engine = state.engine().clone();
        let server = TestServer::new(app_from_state(state)).expect("Failed to create test server");

        Self { server, engine }
    }
}

/// Mints a token valid for one hour.
pub fn token(tenant_id: &str, user_id: &str) -> String {
    let claims = IdentityClaims {
        user_id: Some(user_id.to_string()),
        tenant_id: Some(tenant_id.to_string()),
        role: Some("developer".to_string()),
        exp: (chrono::Utc::now().timestamp() + 3600) as u64,
    };
    issue_token(TEST_SECRET, &claims).expect("Failed to issue token")
}

pub fn bearer(token: &str) -> (HeaderName, HeaderValue) {
    (
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).expect("valid header"),
    )
}

/// Attaches a token for `tenant_id`/`user_id` to a request.
pub fn as_tenant(request: TestRequest, tenant_id: &str, user_id: &str) -> TestRequest {
    let (name, value) = bearer(&token(tenant_id, user_id));
    request.add_header(name, value)
}
