use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::TenantId;

/// The identity on whose behalf a backup or restore runs.
///
/// Supplied per request by the authentication layer. The `id` is the only
/// authorization factor; `email` is carried for display and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Opaque account identifier. Doubles as the tenant id for storage calls.
    pub id: TenantId,
    /// Advisory, human-readable address.
    #[serde(default)]
    pub email: String,
}

impl Principal {
    /// Build a principal without validation.
    #[must_use]
    pub fn new(id: impl Into<TenantId>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
        }
    }

    /// Build a principal from authenticated input, rejecting a blank id.
    pub fn authenticated(
        id: impl Into<TenantId>,
        email: impl Into<String>,
    ) -> Result<Self, CoreError> {
        let principal = Self::new(id, email);
        if principal.id.is_blank() {
            return Err(CoreError::InvalidIdentifier(
                "principal id must not be empty".into(),
            ));
        }
        Ok(principal)
    }

    /// The tenant whose data space this principal operates on.
    #[must_use]
    pub fn tenant(&self) -> &TenantId {
        &self.id
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.email.is_empty() {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{} <{}>", self.id, self.email)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authenticated_rejects_blank_id() {
        let err = Principal::authenticated("  ", "a@b.c").unwrap_err();
        assert!(matches!(err, CoreError::InvalidIdentifier(_)));
    }

    #[test]
    fn display_includes_email_when_present() {
        assert_eq!(Principal::new("u1", "a@b.c").to_string(), "u1 <a@b.c>");
        assert_eq!(Principal::new("u1", "").to_string(), "u1");
    }

    #[test]
    fn tenant_is_id() {
        let p = Principal::new("u7", "x@y.z");
        assert_eq!(p.tenant().as_str(), "u7");
    }
}
