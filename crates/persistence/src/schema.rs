//! Live schema introspection.
//!
//! Table structure is read from the store on every call; nothing is cached,
//! so the engine always reflects the current physical schema.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::StoreTransaction;
use crate::error::{AccessError, StorageResult};
use crate::types::TableSchema;

/// Longest identifier accepted (PostgreSQL's `NAMEDATALEN - 1`).
pub const MAX_IDENTIFIER_LEN: usize = 63;

static IDENTIFIER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok());

/// Returns `true` if `name` is safe to quote into dynamic SQL as a table name.
///
/// ```
/// use novabase_persistence::schema::is_valid_identifier;
///
/// assert!(is_valid_identifier("notes"));
/// assert!(is_valid_identifier("_audit_2024"));
/// assert!(!is_valid_identifier("notes; DROP TABLE notes"));
/// assert!(!is_valid_identifier("9lives"));
/// ```
pub fn is_valid_identifier(name: &str) -> bool {
    name.len() <= MAX_IDENTIFIER_LEN
        && IDENTIFIER
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(name))
}

/// Quotes an identifier for use in SQL. Callers validate first.
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Reads table structure from the live store.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaIntrospector;

impl SchemaIntrospector {
    /// Describes a table.
    ///
    /// # Errors
    ///
    /// * `AccessError::NotExposed` - If the name is not a valid identifier
    /// * `AccessError::SchemaNotFound` - If the table does not physically exist
    pub async fn describe<T: StoreTransaction>(
        tx: &mut T,
        table: &str,
    ) -> StorageResult<TableSchema> {
        if !is_valid_identifier(table) {
            return Err(AccessError::NotExposed {
                table: table.to_string(),
            }
            .into());
        }

        let schema = tx.describe_table(table).await?.ok_or_else(|| {
            AccessError::SchemaNotFound {
                table: table.to_string(),
            }
        })?;

        tracing::trace!(
            table = table,
            columns = schema.columns().len(),
            "Introspected table"
        );
        Ok(schema)
    }
}
