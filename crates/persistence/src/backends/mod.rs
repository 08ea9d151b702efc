//! Database backend implementations.
//!
//! Each backend is gated behind a feature flag.
//!
//! | Backend | Feature | Isolation |
//! |---------|---------|-----------|
//! | SQLite | `sqlite` | Emulated inside the transaction; development and tests |
//! | PostgreSQL | `postgres` | Row-level security policies |

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;
