//! # novabase-rest - Generic multi-tenant table API
//!
//! This crate exposes the tables registered with a
//! [`novabase_persistence`] engine as generic CRUD endpoints. Every request
//! carries a bearer token naming a user, a tenant and a role; the engine
//! binds that tenant to the request's transaction so the store only ever
//! shows the caller its own tenant's rows.
//!
//! ## Backend Support
//!
//! Storage backends are configured through feature flags:
//!
//! - `sqlite` - SQLite backend (default, great for development)
//! - `postgres` - PostgreSQL backend with row-level security (recommended for production)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use novabase_persistence::backends::sqlite::SqliteBackend;
//! use novabase_rest::{ServerConfig, create_app_with_config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = SqliteBackend::open("novabase.db")?;
//!     backend.init_schema()?;
//!
//!     let config = ServerConfig::from_env();
//!     let app = create_app_with_config(Arc::new(backend), config);
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//!     axum::serve(listener, app).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## API Endpoints
//!
//! | Interaction | HTTP Method | URL Pattern | Auth |
//! |------------|-------------|-------------|------|
//! | list | GET | `/api/{table}` | bearer |
//! | create | POST | `/api/{table}` | bearer |
//! | update | PATCH | `/api/{table}/{id}` | bearer |
//! | delete | DELETE | `/api/{table}/{id}` | bearer |
//! | audit trail | GET | `/audit` | bearer |
//! | status | GET | `/` | none |
//! | health | GET | `/health`, `/_liveness`, `/_readiness` | none |
//!
//! ## Error Handling
//!
//! Errors are returned as `{"error": {"reason": "...", "message": "..."}}`
//! with a stable machine-readable reason:
//!
//! | HTTP Status | Reason | Description |
//! |-------------|--------|-------------|
//! | 400 | unknown_field, empty_payload, invalid_payload, integrity_violation, invalid_value | Malformed payload or constraint failure |
//! | 401 | unauthorized | Missing or invalid bearer token |
//! | 403 | security_violation, security_context_missing | Protected field write, or no tenant bound |
//! | 404 | not_found | Table not exposed, or row absent or owned by another tenant |
//! | 408 | request_timeout | Handling took longer than `request_timeout` |
//! | 413 | payload_too_large | Body over `max_body_size` |
//! | 429 | rate_limited | Too many requests from one client |
//! | 500 | internal_error | Unexpected failure, with a `trace_id` |
//!
//! ## Architecture
//!
//! - [`error`] - Error types and their JSON responses
//! - [`config`] - Server configuration
//! - [`state`] - Application state (engine, configuration, injected services)
//! - [`identity`] - Bearer-token verification
//! - [`rate_limit`] - Per-client request limiting
//! - [`handlers`] - HTTP request handlers
//! - [`middleware`] - Request id, timing, security headers and rate limiting
//! - [`extractors`] - Identity and JSON body extractors
//! - [`routing`] - Route configuration

// Enforce documentation
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod identity;
pub mod middleware;
pub mod rate_limit;
pub mod routing;
pub mod state;

// Re-export commonly used types
pub use config::ServerConfig;
pub use error::{RestError, RestResult};
pub use identity::{IdentityClaims, IdentityVerifier, JwtIdentityVerifier, issue_token};
pub use rate_limit::{RateLimiter, SlidingWindowRateLimiter};
pub use state::AppState;

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, extract::DefaultBodyLimit};
use novabase_persistence::core::{Backend, TransactionProvider};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Creates the Axum application with default configuration.
///
/// For more control, use [`create_app_with_config`].
pub fn create_app<B>(backend: Arc<B>) -> Router
where
    B: Backend + TransactionProvider + 'static,
{
    create_app_with_config(backend, ServerConfig::default())
}

/// Creates the Axum application with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use novabase_rest::{create_app_with_config, ServerConfig};
/// use novabase_persistence::backends::sqlite::SqliteBackend;
///
/// let backend = SqliteBackend::in_memory()?;
/// let config = ServerConfig {
///     port: 3000,
///     enable_cors: true,
///     ..Default::default()
/// };
/// let app = create_app_with_config(Arc::new(backend), config);
/// ```
pub fn create_app_with_config<B>(backend: Arc<B>, config: ServerConfig) -> Router
where
    B: Backend + TransactionProvider + 'static,
{
    info!(
        "Creating REST API server with backend: {}",
        backend.name()
    );

    app_from_state(AppState::new(backend, config))
}

/// Creates the Axum application around already built state.
///
/// Used when the identity verifier or rate limiter is swapped out.
pub fn app_from_state<B>(state: AppState<B>) -> Router
where
    B: Backend + TransactionProvider + 'static,
{
    let config = state.config().clone();

    let router = routing::create_routes(state.clone())
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::rate_limit_middleware::<B>,
        ))
        .layer(DefaultBodyLimit::max(config.max_body_size))
        .layer(axum::middleware::from_fn_with_state(
            Duration::from_secs(config.request_timeout),
            middleware::timeout_middleware,
        ))
        .layer(axum::middleware::from_fn(middleware::operational_middleware));

    // Build middleware stack
    let service_builder = ServiceBuilder::new().layer(TraceLayer::new_for_http());

    // Add CORS if enabled
    let router = if config.enable_cors {
        router.layer(build_cors_layer(&config))
    } else {
        router
    };

    router.layer(service_builder)
}

/// Builds the CORS layer based on configuration.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let mut cors = CorsLayer::new();

    if config.cors_origins == "*" {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    if config.cors_methods == "*" {
        cors = cors.allow_methods(Any);
    } else {
        let methods: Vec<_> = config
            .cors_methods
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_methods(methods);
    }

    if config.cors_headers == "*" {
        cors = cors.allow_headers(Any);
    } else {
        let headers: Vec<_> = config
            .cors_headers
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_headers(headers);
    }

    cors
}

/// Initializes the tracing subscriber for logging.
///
/// This should be called once at application startup. `RUST_LOG` takes
/// precedence over `level` when set.
///
/// # Arguments
///
/// * `level` - The log level (error, warn, info, debug, trace)
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "novabase={level},novabase_rest={level},novabase_persistence={level},tower_http=debug"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
