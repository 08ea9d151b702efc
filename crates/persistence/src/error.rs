//! Error types for the persistence layer.
//!
//! Errors are grouped by category so that the HTTP layer can map each
//! category to a stable outcome without inspecting messages. The access
//! category deliberately carries as little detail as possible: callers
//! must not be able to tell an unregistered table from a missing one, or
//! a foreign row from an absent one.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all engine and storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Reachability and tenant-isolation outcomes.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Payload and registration validation errors.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Constraint failures reported by the store.
    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    /// Transaction lifecycle errors.
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// Backend-specific errors.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors that decide whether a caller may reach a table or row.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// The table has no active registration (or its name is not a valid identifier).
    #[error("table not exposed: {table}")]
    NotExposed { table: String },

    /// The table is registered but does not physically exist in the store.
    #[error("table not found in schema: {table}")]
    SchemaNotFound { table: String },

    /// Zero rows matched an update or delete. Never says which of the two
    /// underlying causes (absent row, row of another tenant) applied.
    #[error("resource not found or access denied")]
    NotFoundOrForbidden,

    /// The store refused a statement because no tenant context was bound.
    #[error("security context missing")]
    SecurityContextMissing,
}

/// Errors raised while validating a payload or a registration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The payload attempted to write a system-protected field.
    #[error("security violation: property '{field}' is system-protected and cannot be modified")]
    SecurityViolation { field: String },

    /// The payload names a column the table does not have.
    #[error("property '{field}' does not exist on this resource")]
    UnknownField { field: String },

    /// A create payload contained no writable fields.
    #[error("payload contains no valid fields")]
    EmptyPayload,

    /// The request body was not a JSON object.
    #[error("payload must be a JSON object")]
    InvalidPayload,

    /// A tenant context was built without a required identity value.
    #[error("identity is missing required value '{field}'")]
    MissingIdentity { field: String },

    /// A system table was offered for registration.
    #[error("table '{table}' is reserved")]
    ReservedTable { table: String },

    /// A table cannot be registered because it lacks the tenant column.
    #[error("table '{table}' does not expose a '{column}' column")]
    MissingTenantColumn { table: String, column: String },
}

/// Constraint failures reported by the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    /// Unique, foreign-key, not-null or check constraint violation.
    #[error("database integrity violation: {message}")]
    IntegrityViolation { message: String },

    /// The store could not convert a supplied value to the column type.
    #[error("invalid value: {message}")]
    InvalidValue { message: String },
}

/// Errors related to transactions.
#[derive(Error, Debug)]
pub enum TransactionError {
    /// Transaction is no longer valid (already committed or rolled back).
    #[error("transaction no longer valid")]
    InvalidTransaction,

    /// Beginning, committing or rolling back failed.
    #[error("transaction rolled back: {reason}")]
    RolledBack { reason: String },
}

/// Errors originating from the database backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend is currently unavailable.
    #[error("backend unavailable: {backend_name}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    /// Connection to the backend failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Schema migration error.
    #[error("schema migration failed: {message}")]
    MigrationError { message: String },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },
}

impl StorageError {
    /// Returns `true` if this error must be reported as "not found" to the caller.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::Access(
                AccessError::NotExposed { .. }
                    | AccessError::SchemaNotFound { .. }
                    | AccessError::NotFoundOrForbidden
            )
        )
    }
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        if err.sqlite_error_code() == Some(rusqlite::ErrorCode::ConstraintViolation) {
            return StorageError::Integrity(IntegrityError::IntegrityViolation {
                message: err.to_string(),
            });
        }
        StorageError::Backend(BackendError::Internal {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<r2d2::Error> for StorageError {
    fn from(err: r2d2::Error) -> Self {
        StorageError::Backend(BackendError::ConnectionFailed {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
        })
    }
}

#[cfg(feature = "postgres")]
impl From<tokio_postgres::Error> for StorageError {
    fn from(err: tokio_postgres::Error) -> Self {
        use tokio_postgres::error::SqlState;

        let Some(state) = err.code() else {
            return StorageError::Backend(BackendError::Internal {
                backend_name: "postgres".to_string(),
                message: err.to_string(),
                source: Some(Box::new(err)),
            });
        };

        // 42704: current_setting() on an unset variable; 42501: policy rejection
        if *state == SqlState::UNDEFINED_OBJECT || *state == SqlState::INSUFFICIENT_PRIVILEGE {
            return StorageError::Access(AccessError::SecurityContextMissing);
        }

        let class = state.code().get(..2).unwrap_or_default().to_string();
        let message = err
            .as_db_error()
            .map(|db| db.message().to_string())
            .unwrap_or_else(|| err.to_string());

        match class.as_str() {
            "23" => StorageError::Integrity(IntegrityError::IntegrityViolation { message }),
            "22" => StorageError::Integrity(IntegrityError::InvalidValue { message }),
            _ => StorageError::Backend(BackendError::Internal {
                backend_name: "postgres".to_string(),
                message,
                source: Some(Box::new(err)),
            }),
        }
    }
}
