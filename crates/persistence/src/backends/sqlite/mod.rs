//! SQLite backend implementation.
//!
//! Supports in-memory databases (for tests and local development) and
//! file-based databases. SQLite has no session variables or row-level
//! security, so [`SqliteTransaction`] emulates the store contract the
//! engine relies on: the bound tenant lives in the transaction, and every
//! statement against a table with a `tenant_id` column is confined to it.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use novabase_persistence::backends::sqlite::SqliteBackend;
//! use novabase_persistence::engine::CrudEngine;
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
//! # Ok(())
//! # }
//! ```
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE tables_meta (
//!     id TEXT PRIMARY KEY,
//!     table_name TEXT NOT NULL UNIQUE,
//!     is_active INTEGER NOT NULL DEFAULT 1,
//!     created_at TEXT NOT NULL
//! );
//!
//! CREATE TABLE audit_logs (
//!     id TEXT PRIMARY KEY,
//!     tenant_id TEXT NOT NULL,
//!     user_id TEXT NOT NULL,
//!     action TEXT NOT NULL,        -- CREATE | UPDATE | DELETE
//!     table_name TEXT NOT NULL,
//!     record_id TEXT NOT NULL,
//!     payload TEXT,                -- JSON snapshot, NULL for deletes
//!     timestamp TEXT NOT NULL
//! );
//! ```

mod backend;
mod schema;
mod transaction;

pub use backend::{SqliteBackend, SqliteBackendConfig};
pub use transaction::SqliteTransaction;
