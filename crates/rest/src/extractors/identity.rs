//! Identity extractor.
//!
//! Verifies the `Authorization: Bearer` token with the state's
//! [`IdentityVerifier`](crate::identity::IdentityVerifier) and yields the
//! caller's [`TenantContext`].

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use novabase_persistence::tenant::TenantContext;
use tracing::debug;

use crate::error::RestError;
use crate::identity::{IdentityError, bearer_token};
use crate::middleware::RequestId;
use crate::state::AppState;

/// Axum extractor for the caller's verified identity.
///
/// The request id assigned by the operational middleware becomes the
/// context's correlation id.
///
/// # Example
///
/// ```rust,ignore
/// use novabase_rest::extractors::Identity;
///
/// async fn handler(Identity(ctx): Identity) {
///     println!("Tenant ID: {}", ctx.tenant_id());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Identity(pub TenantContext);

impl Identity {
    /// Returns a reference to the tenant context.
    pub fn context(&self) -> &TenantContext {
        &self.0
    }

    /// Consumes the extractor and returns the tenant context.
    pub fn into_context(self) -> TenantContext {
        self.0
    }
}

impl<B> FromRequestParts<AppState<B>> for Identity
where
    B: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<B>,
    ) -> Result<Self, Self::Rejection> {
        let verified = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or(IdentityError::MissingToken)
            .and_then(|token| state.identity().verify(token));

        let context = match verified {
            Ok(context) => context,
            Err(e) => {
                debug!(error = %e, "Rejected bearer token");
                return Err(RestError::Unauthorized {
                    message: "Could not validate credentials.".to_string(),
                });
            }
        };

        let context = match parts.extensions.get::<RequestId>() {
            Some(request_id) => context.with_correlation_id(request_id.as_str()),
            None => context,
        };

        Ok(Identity(context))
    }
}
