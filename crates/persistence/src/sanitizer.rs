//! Payload sanitization.
//!
//! A raw request body is reduced to a [`Payload`] that only names columns
//! the table actually has and that the public surface may write. The check
//! runs in two passes over the whole body:
//!
//! 1. any key in the [`ProtectedFields`] set, under any casing, rejects the
//!    request with `SecurityViolation`;
//! 2. any key that is not an introspected column rejects it with `UnknownField`.
//!
//! Nothing is silently dropped and no value is coerced.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::error::ValidationError;
use crate::types::{Payload, TableSchema};

/// Column names the public surface may never write, on any table.
pub const PROTECTED_FIELDS: &[&str] = &[
    "tenant_id",
    "id",
    "user_id",
    "created_at",
    "updated_at",
    "deleted_at",
    "owner_id",
    "is_verified",
    "version",
    "metadata",
    "hashed_password",
    "salt",
];

/// A case-insensitive set of protected column names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedFields {
    names: BTreeSet<String>,
}

impl ProtectedFields {
    /// The standard set, [`PROTECTED_FIELDS`].
    pub fn standard() -> Self {
        Self::from_names(PROTECTED_FIELDS.iter().copied())
    }

    /// Builds a set from arbitrary names. Names are stored lowercased.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|n| n.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Returns `true` if `name` is protected, ignoring case.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&name.to_lowercase())
    }

    /// Iterates over the protected names, lowercased.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl Default for ProtectedFields {
    fn default() -> Self {
        Self::standard()
    }
}

/// Which operation a payload is destined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizeMode {
    /// Insert: at least one field is required.
    Create,
    /// Update: an empty payload is passed through.
    Update,
}

/// Filters raw request bodies against the protected set and a table's columns.
#[derive(Debug, Clone, Default)]
pub struct PayloadSanitizer {
    protected: ProtectedFields,
}

impl PayloadSanitizer {
    /// Creates a sanitizer with the given protected set.
    pub fn new(protected: ProtectedFields) -> Self {
        Self { protected }
    }

    /// Returns the protected set.
    pub fn protected(&self) -> &ProtectedFields {
        &self.protected
    }

    /// Sanitizes a raw body for `schema`.
    ///
    /// # Errors
    ///
    /// * `ValidationError::InvalidPayload` - If the body is not a JSON object
    /// * `ValidationError::SecurityViolation` - If any key is protected
    /// * `ValidationError::UnknownField` - If any key is not a column of the table
    /// * `ValidationError::EmptyPayload` - If a create payload names no fields
    pub fn sanitize(
        &self,
        schema: &TableSchema,
        raw: Value,
        mode: SanitizeMode,
    ) -> Result<Payload, ValidationError> {
        let payload = Payload::from_json(raw)?;

        if let Some(field) = payload.columns().find(|key| self.protected.contains(key)) {
            return Err(ValidationError::SecurityViolation {
                field: field.to_string(),
            });
        }

        if let Some(field) = payload.columns().find(|key| !schema.has_column(key)) {
            return Err(ValidationError::UnknownField {
                field: field.to_string(),
            });
        }

        if mode == SanitizeMode::Create && payload.is_empty() {
            return Err(ValidationError::EmptyPayload);
        }

        Ok(payload)
    }
}
