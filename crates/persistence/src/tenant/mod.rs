//! Tenant management for the data-access engine.
//!
//! # Core Types
//!
//! - [`TenantId`], [`UserId`] - Opaque identifiers issued by the identity collaborator
//! - [`TenantContext`] - The trusted, request-scoped identity every operation runs under
//! - [`BoundTransaction`] - A store transaction with that identity applied
//!
//! # Isolation Model
//!
//! All tenants share one schema. Every tenant table carries a `tenant_id`
//! column and the store filters rows against the session variable
//! [`TENANT_SETTING`]. The engine never adds tenant predicates to its own
//! queries; its job is to make sure the variable is always set, set first,
//! and scoped to exactly one transaction.
//!
//! ```text
//! begin ──> registry check ──> bind(ctx) ──> sanitize ──> execute ──> audit ──> commit
//!                                 │
//!                                 └─ SELECT set_config('app.current_tenant', $1, true)
//! ```

mod binding;
mod context;
mod id;

pub use binding::{BoundTransaction, TENANT_SETTING, USER_SETTING, bind};
pub use context::{Role, TenantContext, TenantContextBuilder};
pub use id::{TenantId, UserId};
