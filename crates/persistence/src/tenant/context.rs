//! Tenant context for engine operations.
//!
//! This module defines [`TenantContext`], the trusted identity every engine
//! operation runs under. It is produced by the identity collaborator and is
//! the only source of tenant and user attribution: values supplied in a
//! request payload are never consulted.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::id::{TenantId, UserId};
use crate::error::ValidationError;

/// Role of the caller inside its tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Owner of the tenant.
    Owner,
    /// Administrator of the tenant.
    Admin,
    /// Developer with data access.
    #[default]
    Developer,
}

impl Role {
    /// Parses a role name, case-insensitively. Unknown names yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "owner" => Some(Role::Owner),
            "admin" => Some(Role::Admin),
            "developer" => Some(Role::Developer),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Owner => write!(f, "owner"),
            Role::Admin => write!(f, "admin"),
            Role::Developer => write!(f, "developer"),
        }
    }
}

/// The request-scoped identity every engine operation runs under.
///
/// A `TenantContext` is transient: it is never persisted and never shared
/// between requests. Every method of the CRUD engine takes one, so there is
/// no way to reach tenant data without it.
///
/// ```
/// use novabase_persistence::tenant::{Role, TenantContext, TenantId, UserId};
///
/// let ctx = TenantContext::new(TenantId::new("T1"), UserId::new("u-1"), Role::Owner);
/// assert_eq!(ctx.tenant_id().as_str(), "T1");
/// assert_eq!(ctx.user_id().as_str(), "u-1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    tenant_id: TenantId,
    user_id: UserId,
    role: Role,
    /// Optional correlation ID for request tracing.
    correlation_id: Option<String>,
}

impl TenantContext {
    /// Creates a new tenant context.
    pub fn new(tenant_id: TenantId, user_id: UserId, role: Role) -> Self {
        Self {
            tenant_id,
            user_id,
            role,
            correlation_id: None,
        }
    }

    /// Creates a context with the specified correlation ID for tracing.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Returns the tenant ID.
    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    /// Returns the user ID.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Returns the caller's role.
    pub fn role(&self) -> &Role {
        &self.role
    }

    /// Returns the correlation ID, if set.
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }
}

/// Builder for tenant contexts constructed from external input
/// (token claims, test fixtures).
#[derive(Debug, Default)]
pub struct TenantContextBuilder {
    tenant_id: Option<TenantId>,
    user_id: Option<UserId>,
    role: Option<Role>,
    correlation_id: Option<String>,
}

impl TenantContextBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the tenant ID.
    pub fn tenant_id(mut self, tenant_id: impl Into<TenantId>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Sets the user ID.
    pub fn user_id(mut self, user_id: impl Into<UserId>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Sets the role.
    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Sets the correlation ID.
    pub fn correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Builds the context. Tenant and user ids are required and must not be blank.
    pub fn build(self) -> Result<TenantContext, ValidationError> {
        let tenant_id = self
            .tenant_id
            .filter(|id| !id.is_blank())
            .ok_or_else(|| ValidationError::MissingIdentity {
                field: "tenant_id".to_string(),
            })?;
        let user_id = self
            .user_id
            .filter(|id| !id.is_blank())
            .ok_or_else(|| ValidationError::MissingIdentity {
                field: "user_id".to_string(),
            })?;

        let mut ctx = TenantContext::new(tenant_id, user_id, self.role.unwrap_or_default());
        ctx.correlation_id = self.correlation_id;
        Ok(ctx)
    }
}
