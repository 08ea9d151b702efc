//! Application state for the NovaBase API.
//!
//! Holds the CRUD engine, configuration, and the injected services handlers
//! depend on: the identity verifier and the rate limiter. Each is built once
//! at startup and shared by handle.

use std::sync::Arc;
use std::time::Duration;

use novabase_persistence::core::{Backend, TransactionProvider};
use novabase_persistence::engine::CrudEngine;

use crate::config::ServerConfig;
use crate::identity::{IdentityVerifier, JwtIdentityVerifier};
use crate::rate_limit::{RateLimiter, SlidingWindowRateLimiter};

/// Shared application state for the REST API.
///
/// # Type Parameters
///
/// * `B` - The storage backend type
///
/// # Example
///
/// ```rust,ignore
/// use novabase_rest::{AppState, ServerConfig};
/// use novabase_persistence::backends::sqlite::SqliteBackend;
/// use std::sync::Arc;
///
/// let backend = SqliteBackend::in_memory()?;
/// let state = AppState::new(Arc::new(backend), ServerConfig::for_testing());
/// ```
pub struct AppState<B> {
    /// The CRUD engine.
    engine: CrudEngine<B>,

    /// Server configuration.
    config: Arc<ServerConfig>,

    /// Bearer-token verifier.
    identity: Arc<dyn IdentityVerifier>,

    /// Per-client request limiter.
    rate_limiter: Arc<dyn RateLimiter>,
}

// Manually implement Clone since B is wrapped in Arc and doesn't need to be Clone
impl<B> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            config: Arc::clone(&self.config),
            identity: Arc::clone(&self.identity),
            rate_limiter: Arc::clone(&self.rate_limiter),
        }
    }
}

impl<B> AppState<B>
where
    B: Backend + TransactionProvider + 'static,
{
    /// Creates state with a JWT verifier and a sliding-window limiter built
    /// from `config`.
    pub fn new(backend: Arc<B>, config: ServerConfig) -> Self {
        let identity = Arc::new(JwtIdentityVerifier::with_secret_str(&config.jwt_secret));
        let rate_limiter = Arc::new(SlidingWindowRateLimiter::new(
            config.rate_limit,
            Duration::from_secs(config.rate_limit_window),
        ));
        Self::with_services(CrudEngine::new(backend), config, identity, rate_limiter)
    }

    /// Creates state from explicitly constructed services.
    pub fn with_services(
        engine: CrudEngine<B>,
        config: ServerConfig,
        identity: Arc<dyn IdentityVerifier>,
        rate_limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        Self {
            engine,
            config: Arc::new(config),
            identity,
            rate_limiter,
        }
    }

    /// Returns the CRUD engine.
    pub fn engine(&self) -> &CrudEngine<B> {
        &self.engine
    }

    /// Returns the backend name.
    pub fn backend_name(&self) -> &'static str {
        self.engine.backend().name()
    }
}

impl<B> AppState<B> {
    /// Returns a reference to the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the identity verifier.
    pub fn identity(&self) -> &dyn IdentityVerifier {
        self.identity.as_ref()
    }

    /// Returns the rate limiter.
    pub fn rate_limiter(&self) -> &dyn RateLimiter {
        self.rate_limiter.as_ref()
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use novabase_persistence::backends::sqlite::SqliteBackend;

    fn state(config: ServerConfig) -> AppState<SqliteBackend> {
        let backend = SqliteBackend::in_memory().unwrap();
        AppState::new(Arc::new(backend), config)
    }

    #[test]
    fn test_app_state_creation() {
        let state = state(ServerConfig::for_testing());
        assert_eq!(state.backend_name(), "sqlite");
        assert_eq!(state.config().jwt_secret, "test-secret");
    }

    #[test]
    fn test_app_state_limiter_from_config() {
        let state = state(ServerConfig {
            rate_limit: 1,
            ..ServerConfig::for_testing()
        });
        let limiter = state.rate_limiter();
        assert!(matches!(
            limiter.check("k"),
            crate::rate_limit::RateLimitDecision::Allowed
        ));
        assert!(matches!(
            limiter.check("k"),
            crate::rate_limit::RateLimitDecision::Limited { .. }
        ));
    }

    #[test]
    fn test_app_state_clone() {
        let state = state(ServerConfig::for_testing());
        let cloned = state.clone();
        assert_eq!(state.config().port, cloned.config().port);
    }
}
