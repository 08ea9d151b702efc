//! HTTP request handlers.
//!
//! - [`tables`] - Generic list, create, update and delete on exposed tables
//! - [`audit`] - The caller tenant's audit trail
//! - [`health`] - Status, health, liveness and readiness checks

pub mod audit;
pub mod health;
pub mod tables;

// Re-export handlers for convenience
pub use audit::audit_handler;
pub use health::{health_handler, liveness_handler, readiness_handler, root_handler};
pub use tables::{create_handler, delete_handler, list_handler, update_handler};
