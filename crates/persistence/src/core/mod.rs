//! Core storage traits and abstractions.
//!
//! - [`Backend`] - Store lifecycle (health, schema bootstrap)
//! - [`TransactionProvider`] - Hands out one transaction per request
//! - [`StoreTransaction`] - Store primitives used by the engine

mod backend;
mod transaction;

pub use backend::{Backend, BackendKind};
pub use transaction::{StoreTransaction, TransactionProvider};
