//! Tenant model and its filesystem layout.

use serde::{Deserialize, Serialize};

/// A validated tenant identifier. `default` is the distinguished tenant
/// whose artifacts live directly under `runs/` and `dist/` rather than
/// under a `tenants/<id>/` subdirectory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
pub struct TenantId(String);

impl TenantId {
    pub const DEFAULT: &'static str = "default";

    /// Validate and construct a tenant id. Tenant ids are used directly as
    /// path components, so they must not contain path separators or `..`.
    pub fn parse(raw: impl Into<String>) -> Result<Self, crate::domain::DomainError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(crate::domain::DomainError::UsageError(
                "tenant id must not be empty".into(),
            ));
        }
        let valid = raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid || raw == "." || raw == ".." {
            return Err(crate::domain::DomainError::UsageError(format!(
                "invalid tenant id: {raw}"
            )));
        }
        Ok(Self(raw))
    }

    pub fn default_tenant() -> Self {
        Self(Self::DEFAULT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0 == Self::DEFAULT
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TenantId {
    type Err = crate::domain::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
