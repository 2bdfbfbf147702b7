//! Kubernetes access
//!
//! [`K8Client`] is the seam between configuration management and a real
//! cluster. [`KubectlClient`] drives the `kubectl` binary; tests use an
//! in-memory implementation.

mod kubectl;

use std::collections::BTreeMap;
use std::fmt::{self, Debug};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::K8Error;

pub use kubectl::KubectlClient;

/// Kube context and namespace an operation runs against
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    /// Kube context
    pub context: String,
    /// Namespace
    pub namespace: String,
}

impl Target {
    /// Create target
    #[inline]
    #[must_use]
    pub fn new(context: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.context, self.namespace)
    }
}

/// ConfigMap
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMap {
    /// Name
    pub name: String,
    /// Namespace
    pub namespace: String,
    /// Labels
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// String data
    #[serde(default)]
    pub data: BTreeMap<String, String>,
    /// Resource version; `None` for objects not yet stored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

impl ConfigMap {
    /// Create an unsaved ConfigMap
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// With label
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// With data entry
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Check if every `key=value` term of a selector matches the labels
    #[must_use]
    pub fn matches(&self, selector: &str) -> bool {
        selector_matches(&self.labels, selector)
    }
}

/// Pod summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pod {
    /// Name
    pub name: String,
    /// Namespace
    pub namespace: String,
    /// Labels
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Pod phase as reported by the cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
}

impl Pod {
    /// Create pod summary
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// With label
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Check if every `key=value` term of a selector matches the labels
    #[must_use]
    pub fn matches(&self, selector: &str) -> bool {
        selector_matches(&self.labels, selector)
    }
}

/// Equality-based label selector match (`a=b,c=d`)
#[must_use]
pub fn selector_matches(labels: &BTreeMap<String, String>, selector: &str) -> bool {
    selector
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .all(|term| match term.split_once('=') {
            Some((key, value)) => labels.get(key.trim()).is_some_and(|v| v == value.trim()),
            None => labels.contains_key(term),
        })
}

/// Cluster operations needed by solo
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait K8Client: Send + Sync + Debug {
    /// List ConfigMaps matching a label selector
    async fn list_config_maps(&self, target: &Target, selector: &str) -> Result<Vec<ConfigMap>, K8Error>;

    /// Read one ConfigMap
    async fn read_config_map(&self, target: &Target, name: &str) -> Result<ConfigMap, K8Error>;

    /// Create a ConfigMap; fails with `AlreadyExists` if the name is taken
    async fn create_config_map(&self, context: &str, config_map: &ConfigMap) -> Result<ConfigMap, K8Error>;

    /// Replace a ConfigMap
    ///
    /// When `resource_version` is set the write only succeeds if the stored
    /// object still has that version, otherwise it fails with `Conflict`.
    async fn replace_config_map(&self, context: &str, config_map: &ConfigMap) -> Result<ConfigMap, K8Error>;

    /// Delete a ConfigMap
    ///
    /// With `resource_version` the delete only succeeds if the stored object
    /// still has that version, otherwise it fails with `Conflict`.
    async fn delete_config_map<'a>(
        &self,
        target: &Target,
        name: &str,
        resource_version: Option<&'a str>,
    ) -> Result<(), K8Error>;

    /// List pods matching a label selector
    async fn list_pods(&self, target: &Target, selector: &str) -> Result<Vec<Pod>, K8Error>;

    /// Configured kube contexts
    async fn list_contexts(&self) -> Result<Vec<String>, K8Error>;

    /// Current kube context
    async fn current_context(&self) -> Result<String, K8Error>;

    /// Check if a namespace exists
    async fn namespace_exists(&self, target: &Target) -> Result<bool, K8Error>;

    /// Create a namespace
    async fn create_namespace(&self, target: &Target) -> Result<(), K8Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_match_all_terms() {
        let pod = Pod::new("network-node1-0", "solo")
            .with_label("solo.hedera.com/type", "network-node")
            .with_label("solo.hedera.com/node-name", "node1");
        assert!(pod.matches("solo.hedera.com/type=network-node"));
        assert!(pod.matches("solo.hedera.com/type=network-node, solo.hedera.com/node-name=node1"));
        assert!(pod.matches("solo.hedera.com/node-name"));
        assert!(!pod.matches("solo.hedera.com/type=haproxy"));
        assert!(pod.matches(""));
    }

    #[test]
    fn config_map_builder() {
        let cm = ConfigMap::new("solo-remote-config", "solo")
            .with_label("solo.hedera.com/type", "remote-config")
            .with_data("remote-config-data", "{}");
        assert!(cm.matches("solo.hedera.com/type=remote-config"));
        assert_eq!(cm.resource_version, None);
        assert_eq!(cm.data["remote-config-data"], "{}");
    }
}
