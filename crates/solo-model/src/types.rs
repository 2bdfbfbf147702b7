//! Identifier and identity types shared by both config documents

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Default DNS base domain for in-cluster service names
pub const DEFAULT_DNS_BASE_DOMAIN: &str = "cluster.local";

/// Default consensus node service name pattern
///
/// Placeholders: `{nodeAlias}`, `{nodeId}`, `{namespace}`, `{cluster}`.
pub const DEFAULT_DNS_CONSENSUS_NODE_PATTERN: &str = "network-{nodeAlias}-svc.{namespace}.svc";

/// Logical name of a target Kubernetes cluster
///
/// Mapped to a concrete kube context by the local config.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterRef(String);

impl ClusterRef {
    /// Create cluster reference
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClusterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClusterRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ClusterRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for ClusterRef {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Component identifier, unique per component type
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ComponentId(u32);

impl ComponentId {
    /// Create component id
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get numeric value
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Following id, `None` at `u32::MAX`
    #[inline]
    #[must_use]
    pub const fn checked_next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operator identity recorded on documents
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserIdentity {
    /// User name
    pub name: String,
    /// Machine host name
    pub hostname: String,
}

impl UserIdentity {
    /// Create identity
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hostname: hostname.into(),
        }
    }
}

impl Default for UserIdentity {
    fn default() -> Self {
        Self::new("unknown", "unknown")
    }
}

impl fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.hostname)
    }
}
