//! Introspected table structure.

use serde::{Deserialize, Serialize};

/// Column holding the owning tenant of a row.
pub const TENANT_COLUMN: &str = "tenant_id";

/// Column holding the acting user, set on create when present.
pub const USER_COLUMN: &str = "user_id";

/// Primary key column used by update and delete.
pub const ID_COLUMN: &str = "id";

/// One column of a table, as reported by the live store schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name.
    pub name: String,
    /// Declared type, as spelled by the store.
    pub data_type: String,
    /// Whether the column accepts `NULL`.
    pub nullable: bool,
}

impl ColumnDescriptor {
    /// Creates a column descriptor.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
        }
    }
}

/// The column set of a table at the moment it was introspected.
///
/// Produced fresh for every request and never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    table_name: String,
    columns: Vec<ColumnDescriptor>,
}

impl TableSchema {
    /// Creates a schema from introspected columns, in ordinal order.
    pub fn new(table_name: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            table_name: table_name.into(),
            columns,
        }
    }

    /// Returns the table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Returns the columns, in ordinal order.
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Looks up a column by exact name.
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns `true` if the table has a column with exactly this name.
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Returns `true` if rows of this table are owned by a tenant.
    pub fn is_tenant_scoped(&self) -> bool {
        self.has_column(TENANT_COLUMN)
    }

    /// Iterates over the column names, in ordinal order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}
