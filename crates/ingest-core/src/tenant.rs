use std::fmt;

use serde::{Deserialize, Serialize};

/// Isolation key carried on every content-table row (SPEC_FULL I5).
///
/// Cross-tenant reads must return zero rows; every repository method that
/// touches a content table takes a `&TenantId` and folds it into the WHERE
/// clause rather than trusting callers to remember.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(String);

impl TenantId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TenantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
