//! Backend abstraction for database drivers.
//!
//! This module defines the [`Backend`] trait, the lifecycle half of a store
//! implementation (health, schema bootstrap). Per-request work goes through
//! [`TransactionProvider`](super::TransactionProvider).

use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::BackendError;

/// Identifies the type of database backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// SQLite database (file-based or in-memory).
    Sqlite,
    /// PostgreSQL database.
    Postgres,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Sqlite => write!(f, "sqlite"),
            BackendKind::Postgres => write!(f, "postgres"),
        }
    }
}

/// A relational store the engine can run against.
///
/// The store must offer schema introspection, transaction-scoped session
/// variables and row filtering keyed on those variables. PostgreSQL does
/// all three natively; the SQLite backend emulates the last two.
#[async_trait]
pub trait Backend: Send + Sync + Debug {
    /// Returns the kind of backend.
    fn kind(&self) -> BackendKind;

    /// Returns the backend name.
    fn name(&self) -> &'static str;

    /// Checks that the store is reachable.
    async fn health_check(&self) -> Result<(), BackendError>;

    /// Creates the system tables (`tables_meta`, `audit_logs`) if missing.
    async fn initialize(&self) -> Result<(), BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_display() {
        assert_eq!(BackendKind::Sqlite.to_string(), "sqlite");
        assert_eq!(BackendKind::Postgres.to_string(), "postgres");
    }
}
