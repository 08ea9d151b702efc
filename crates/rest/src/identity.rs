//! Bearer-token identity.
//!
//! The API trusts an [`IdentityVerifier`] to turn a bearer token into the
//! [`TenantContext`] every engine call runs under. Tenant and user come
//! only from the verified token, never from the request body.
//!
//! # JWT Claims
//!
//! [`JwtIdentityVerifier`] accepts HS256 tokens carrying:
//! - `user_id`: acting user (required)
//! - `tenant_id`: tenant the user belongs to (required)
//! - `role`: `owner`, `admin` or `developer` (optional, defaults to `developer`)
//! - `exp`: expiration timestamp (required)
//!
//! ```json
//! {"user_id": "u-1", "tenant_id": "acme", "role": "admin", "exp": 1735689600}
//! ```

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use novabase_persistence::tenant::{Role, TenantContext, TenantContextBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a bearer token is refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// No `Authorization: Bearer` header.
    #[error("missing bearer token")]
    MissingToken,

    /// Signature, expiry or format check failed.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// The token verified but lacks a required identity claim.
    #[error("token is missing the '{0}' claim")]
    MissingClaim(String),
}

/// Turns a bearer token into a trusted tenant context.
pub trait IdentityVerifier: Send + Sync {
    /// Verifies `token` and returns the identity it carries.
    fn verify(&self, token: &str) -> Result<TenantContext, IdentityError>;
}

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Acting user.
    #[serde(default)]
    pub user_id: Option<String>,

    /// Tenant of the user.
    #[serde(default)]
    pub tenant_id: Option<String>,

    /// Role within the tenant.
    #[serde(default)]
    pub role: Option<String>,

    /// Expiration time (Unix timestamp).
    pub exp: u64,
}

/// HS256 JWT verifier.
pub struct JwtIdentityVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityVerifier {
    /// Creates a verifier for tokens signed with `secret`.
    pub fn with_secret(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Creates a verifier from a secret string.
    pub fn with_secret_str(secret: &str) -> Self {
        Self::with_secret(secret.as_bytes())
    }
}

impl std::fmt::Debug for JwtIdentityVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtIdentityVerifier")
            .field("algorithm", &Algorithm::HS256)
            .finish_non_exhaustive()
    }
}

impl IdentityVerifier for JwtIdentityVerifier {
    fn verify(&self, token: &str) -> Result<TenantContext, IdentityError> {
        let claims = decode::<IdentityClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| IdentityError::InvalidToken(e.to_string()))?
            .claims;

        let mut builder = TenantContextBuilder::new();
        if let Some(tenant_id) = claims.tenant_id {
            builder = builder.tenant_id(tenant_id);
        }
        if let Some(user_id) = claims.user_id {
            builder = builder.user_id(user_id);
        }
        let role = claims
            .role
            .as_deref()
            .and_then(Role::parse)
            .unwrap_or_default();

        builder.role(role).build().map_err(|e| match e {
            novabase_persistence::error::ValidationError::MissingIdentity { field } => {
                IdentityError::MissingClaim(field)
            }
            other => IdentityError::InvalidToken(other.to_string()),
        })
    }
}

/// Signs claims with an HMAC secret. Used by tooling and tests to mint tokens.
pub fn issue_token(secret: &[u8], claims: &IdentityClaims) -> Result<String, IdentityError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| IdentityError::InvalidToken(e.to_string()))
}

/// Extracts the token from an `Authorization` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"unit-secret";

    fn claims(user: Option<&str>, tenant: Option<&str>) -> IdentityClaims {
        IdentityClaims {
            user_id: user.map(String::from),
            tenant_id: tenant.map(String::from),
            role: Some("admin".to_string()),
            exp: (chrono::Utc::now().timestamp() + 3600) as u64,
        }
    }

    #[test]
    fn test_verify_valid_token() {
        let token = issue_token(SECRET, &claims(Some("u-1"), Some("acme"))).unwrap();
        let ctx = JwtIdentityVerifier::with_secret(SECRET)
            .verify(&token)
            .unwrap();
        assert_eq!(ctx.tenant_id().as_str(), "acme");
        assert_eq!(ctx.user_id().as_str(), "u-1");
        assert_eq!(ctx.role(), &Role::Admin);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = issue_token(b"other", &claims(Some("u-1"), Some("acme"))).unwrap();
        let result = JwtIdentityVerifier::with_secret(SECRET).verify(&token);
        assert!(matches!(result, Err(IdentityError::InvalidToken(_))));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let mut expired = claims(Some("u-1"), Some("acme"));
        expired.exp = (chrono::Utc::now().timestamp() - 60) as u64;
        let token = issue_token(SECRET, &expired).unwrap();
        let result = JwtIdentityVerifier::with_secret(SECRET).verify(&token);
        assert!(matches!(result, Err(IdentityError::InvalidToken(_))));
    }

    #[test]
    fn test_missing_claims_are_rejected() {
        let verifier = JwtIdentityVerifier::with_secret(SECRET);

        let token = issue_token(SECRET, &claims(Some("u-1"), None)).unwrap();
        assert_eq!(
            verifier.verify(&token),
            Err(IdentityError::MissingClaim("tenant_id".to_string()))
        );

        let token = issue_token(SECRET, &claims(None, Some("acme"))).unwrap();
        assert_eq!(
            verifier.verify(&token),
            Err(IdentityError::MissingClaim("user_id".to_string()))
        );

        let token = issue_token(SECRET, &claims(Some("u-1"), Some("  "))).unwrap();
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn test_unknown_role_defaults_to_developer() {
        let mut odd = claims(Some("u-1"), Some("acme"));
        odd.role = Some("superuser".to_string());
        let token = issue_token(SECRET, &odd).unwrap();
        let ctx = JwtIdentityVerifier::with_secret(SECRET)
            .verify(&token)
            .unwrap();
        assert_eq!(ctx.role(), &Role::Developer);
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer  abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bearer"), None);
    }
}
