//! HTTP middleware for the NovaBase API.
//!
//! - [`operational`] - Request ids, security headers, latency, request log
//! - [`rate_limit`] - Per-client request limiting
//! - [`timeout`] - Request time limit with a JSON 408

pub mod operational;
pub mod rate_limit;
pub mod timeout;

pub use operational::{RequestId, X_PROCESS_TIME, X_REQUEST_ID, operational_middleware};
pub use rate_limit::{client_key, rate_limit_middleware};
pub use timeout::timeout_middleware;
