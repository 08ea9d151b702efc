//! NovaBase Persistence Layer
//!
//! This crate is the tenant-isolated data-access engine behind NovaBase. It
//! exposes an allow-listed set of relational tables through one generic set
//! of CRUD operations, without per-table code.
//!
//! # Features
//!
//! - **Table allow-list**: deny-by-default registry of reachable tables
//! - **Live introspection**: column sets are read from the store on every request
//! - **Payload sanitization**: protected and unknown fields are rejected outright
//! - **Tenant propagation**: the caller's tenant and user are bound into
//!   transaction-local session variables before any table is touched
//! - **Atomic auditing**: every mutation appends an audit record in its own transaction
//!
//! # Backend Features
//!
//! ```toml
//! [dependencies]
//! novabase-persistence = { version = "0.1", features = ["postgres"] }
//! ```
//!
//! - `sqlite` (default) - SQLite with in-memory and file modes
//! - `postgres` - PostgreSQL with row-level security
//!
//! # Architecture
//!
//! - [`tenant`] - Identity context and session-variable binding
//! - [`types`] - Rows, payloads, column descriptors, audit records
//! - [`error`] - Error types for all operations
//! - [`core`] - Backend and transaction traits
//! - [`registry`] - Table allow-list
//! - [`schema`] - Schema introspection and identifier rules
//! - [`sanitizer`] - Payload sanitization
//! - [`audit`] - Audit logging
//! - [`engine`] - The CRUD engine tying the above together
//! - [`backends`] - Backend implementations (SQLite, PostgreSQL)
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use novabase_persistence::backends::sqlite::SqliteBackend;
//! use novabase_persistence::engine::CrudEngine;
//! use novabase_persistence::tenant::{Role, TenantContext, TenantId, UserId};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = SqliteBackend::in_memory()?;
//! backend.init_schema()?;
//! backend.execute_batch(
//!     "CREATE TABLE notes (id INTEGER PRIMARY KEY, tenant_id TEXT NOT NULL, title TEXT)",
//! )?;
//!
//! let engine = CrudEngine::new(Arc::new(backend));
//! engine.register_table("notes").await?;
//!
//! let ctx = TenantContext::new(TenantId::new("acme"), UserId::new("u-1"), Role::Developer);
//! let row = engine.create(&ctx, "notes", json!({"title": "hello"})).await?;
//! assert_eq!(row["tenant_id"], "acme");
//! # Ok(())
//! # }
//! ```
//!
//! # Multitenancy
//!
//! Every table operation requires a [`TenantContext`](tenant::TenantContext).
//! Table statements can only be issued through a
//! [`BoundTransaction`](tenant::BoundTransaction), which is obtainable only
//! from [`tenant::bind`], so an unbound statement does not type-check.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod audit;
pub mod backends;
pub mod core;
pub mod engine;
pub mod error;
pub mod registry;
pub mod sanitizer;
pub mod schema;
pub mod tenant;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{StorageError, StorageResult};
pub use tenant::{Role, TenantContext, TenantId, UserId};
pub use types::{AuditAction, AuditRecord, Payload, Row, TableSchema};

// Re-export core traits
pub use core::{Backend, BackendKind, StoreTransaction, TransactionProvider};

pub use engine::{CrudEngine, DeleteOutcome};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
