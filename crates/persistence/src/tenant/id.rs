//! Tenant and user identifier types.
//!
//! Both identifiers are opaque strings issued by the identity collaborator.
//! They are kept as distinct types so a user id can never be bound where a
//! tenant id is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from the given string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns `true` if the identifier is empty or only whitespace.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

opaque_id! {
    /// An opaque tenant identifier.
    ///
    /// # Examples
    ///
    /// ```
    /// use novabase_persistence::tenant::TenantId;
    ///
    /// let tenant = TenantId::new("T1");
    /// assert_eq!(tenant.as_str(), "T1");
    /// ```
    TenantId
}

opaque_id! {
    /// An opaque user identifier, recorded for attribution and auditing.
    UserId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_id_creation() {
        let tenant = TenantId::new("my-tenant");
        assert_eq!(tenant.as_str(), "my-tenant");
        assert_eq!(tenant.to_string(), "my-tenant");
    }

    #[test]
    fn test_debug_names_the_type() {
        assert_eq!(format!("{:?}", TenantId::new("t1")), "TenantId(t1)");
        assert_eq!(format!("{:?}", UserId::new("u1")), "UserId(u1)");
    }

    #[test]
    fn test_blank() {
        assert!(TenantId::new("  ").is_blank());
        assert!(!UserId::new("u").is_blank());
    }

    #[test]
    fn test_serde_transparent() {
        let tenant = TenantId::new("acme");
        let json = serde_json::to_string(&tenant).unwrap();
        assert_eq!(json, "\"acme\"");

        let parsed: TenantId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, tenant);
    }

    #[test]
    fn test_from_string() {
        let tenant: TenantId = "my-tenant".into();
        assert_eq!(tenant.as_str(), "my-tenant");

        let user: UserId = String::from("user-1").into();
        assert_eq!(user.as_str(), "user-1");
    }
}
