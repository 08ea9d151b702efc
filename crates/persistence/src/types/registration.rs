//! Table registry records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An entry of the table allow-list (`tables_meta`).
///
/// A table is reachable through the API only while its registration is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRegistration {
    /// Registration id.
    pub id: String,
    /// Name of the exposed table. Unique.
    pub table_name: String,
    /// Whether the table is currently reachable.
    pub is_active: bool,
    /// When the table was first registered.
    pub created_at: DateTime<Utc>,
}
