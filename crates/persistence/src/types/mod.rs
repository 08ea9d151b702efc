//! Core types for the persistence layer.
//!
//! - [`Payload`], [`FieldValue`] - Typed request bodies
//! - [`Row`] - Stored rows as returned by the store
//! - [`TableSchema`], [`ColumnDescriptor`] - Introspected table structure
//! - [`TableRegistration`] - Entries of the table allow-list
//! - [`AuditRecord`], [`AuditAction`] - Entries of the audit ledger

mod audit;
mod column;
mod registration;
mod value;

pub use audit::{AuditAction, AuditRecord};
pub use column::{ColumnDescriptor, ID_COLUMN, TENANT_COLUMN, TableSchema, USER_COLUMN};
pub use registration::TableRegistration;
pub use value::{FieldValue, Payload, Row};
