//! Local configuration document
//!
//! Per-user file recording who the operator is, which deployments they work
//! with, and how cluster references map to kube contexts.
//!
//! Every setter works on a copy, validates the whole document, and commits
//! only if validation passes; a `LocalConfig` value is therefore always
//! valid once constructed.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use solo_mapper::{apply_property_value, from_object, to_object};

use crate::error::ModelError;
use crate::types::{ClusterRef, UserIdentity};
use crate::validation::{is_email, ValidationErrors, ViolationKind};

/// Current local config schema version
pub const LOCAL_CONFIG_SCHEMA_VERSION: u32 = 2;

/// Deployment known to this operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    /// Deployment name
    pub name: String,
    /// Namespace in every cluster
    pub namespace: String,
    /// Clusters the deployment spans
    pub clusters: Vec<ClusterRef>,
    /// Hedera realm
    #[serde(default)]
    pub realm: u64,
    /// Hedera shard
    #[serde(default)]
    pub shard: u64,
}

impl Deployment {
    /// Create deployment in realm 0, shard 0
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, clusters: Vec<ClusterRef>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            clusters,
            realm: 0,
            shard: 0,
        }
    }
}

/// Version pins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocalVersions {
    /// CLI version that last wrote the file
    pub cli: String,
    /// Pinned solo chart version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<String>,
}

impl Default for LocalVersions {
    fn default() -> Self {
        Self {
            cli: "0.0.0".to_string(),
            chart: None,
        }
    }
}

/// Local config document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalConfig {
    schema_version: u32,
    user_email_address: String,
    #[serde(default)]
    user_identity: UserIdentity,
    #[serde(default)]
    deployments: Vec<Deployment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    current_deployment_name: Option<String>,
    #[serde(default)]
    cluster_refs: BTreeMap<ClusterRef, String>,
    #[serde(default)]
    versions: LocalVersions,
}

impl LocalConfig {
    /// Create a config with no deployments
    ///
    /// # Errors
    /// Returns validation errors for a malformed email address
    pub fn new(user_email_address: impl Into<String>, user_identity: UserIdentity) -> Result<Self, ModelError> {
        let config = Self {
            schema_version: LOCAL_CONFIG_SCHEMA_VERSION,
            user_email_address: user_email_address.into(),
            user_identity,
            deployments: Vec::new(),
            current_deployment_name: None,
            cluster_refs: BTreeMap::new(),
            versions: LocalVersions::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Declared schema version
    #[inline]
    #[must_use]
    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    /// Operator email
    #[inline]
    #[must_use]
    pub fn user_email_address(&self) -> &str {
        &self.user_email_address
    }

    /// Operator identity
    #[inline]
    #[must_use]
    pub fn user_identity(&self) -> &UserIdentity {
        &self.user_identity
    }

    /// Known deployments
    #[inline]
    #[must_use]
    pub fn deployments(&self) -> &[Deployment] {
        &self.deployments
    }

    /// Deployment by name
    #[must_use]
    pub fn deployment(&self, name: &str) -> Option<&Deployment> {
        self.deployments.iter().find(|d| d.name == name)
    }

    /// Currently selected deployment name
    #[must_use]
    pub fn current_deployment_name(&self) -> Option<&str> {
        self.current_deployment_name.as_deref()
    }

    /// Currently selected deployment
    #[must_use]
    pub fn current_deployment(&self) -> Option<&Deployment> {
        self.current_deployment_name
            .as_deref()
            .and_then(|name| self.deployment(name))
    }

    /// Cluster ref to kube context mapping
    #[inline]
    #[must_use]
    pub fn cluster_refs(&self) -> &BTreeMap<ClusterRef, String> {
        &self.cluster_refs
    }

    /// Kube context for a cluster ref
    #[must_use]
    pub fn context_for(&self, cluster: &ClusterRef) -> Option<&str> {
        self.cluster_refs.get(cluster).map(String::as_str)
    }

    /// Version pins
    #[inline]
    #[must_use]
    pub fn versions(&self) -> &LocalVersions {
        &self.versions
    }

    fn update(&mut self, change: impl FnOnce(&mut Self)) -> Result<(), ModelError> {
        let mut next = self.clone();
        change(&mut next);
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Set operator email
    ///
    /// # Errors
    /// Returns validation errors; the config is left unchanged
    pub fn set_user_email_address(&mut self, email: impl Into<String>) -> Result<(), ModelError> {
        let email = email.into();
        self.update(|c| c.user_email_address = email)
    }

    /// Set operator identity
    ///
    /// # Errors
    /// Returns validation errors; the config is left unchanged
    pub fn set_user_identity(&mut self, identity: UserIdentity) -> Result<(), ModelError> {
        self.update(|c| c.user_identity = identity)
    }

    /// Replace all deployments
    ///
    /// # Errors
    /// Returns validation errors; the config is left unchanged
    pub fn set_deployments(&mut self, deployments: Vec<Deployment>) -> Result<(), ModelError> {
        self.update(|c| c.deployments = deployments)
    }

    /// Add a deployment, replacing one with the same name
    ///
    /// # Errors
    /// Returns validation errors; the config is left unchanged
    pub fn add_deployment(&mut self, deployment: Deployment) -> Result<(), ModelError> {
        self.update(|c| {
            match c.deployments.iter_mut().find(|d| d.name == deployment.name) {
                Some(existing) => *existing = deployment,
                None => c.deployments.push(deployment),
            }
            c.deployments.sort_by(|a, b| a.name.cmp(&b.name));
        })
    }

    /// Remove a deployment, clearing the selection if it was current
    ///
    /// # Errors
    /// Returns `DeploymentNotFound` if no deployment has this name
    pub fn remove_deployment(&mut self, name: &str) -> Result<Deployment, ModelError> {
        let index = self
            .deployments
            .iter()
            .position(|d| d.name == name)
            .ok_or_else(|| ModelError::DeploymentNotFound(name.to_string()))?;
        let removed = self.deployments.remove(index);
        if self.current_deployment_name.as_deref() == Some(name) {
            self.current_deployment_name = None;
        }
        Ok(removed)
    }

    /// Select the current deployment
    ///
    /// # Errors
    /// Returns `DeploymentNotFound` if no deployment has this name
    pub fn set_current_deployment(&mut self, name: impl Into<String>) -> Result<(), ModelError> {
        let name = name.into();
        if self.deployment(&name).is_none() {
            return Err(ModelError::DeploymentNotFound(name));
        }
        self.update(|c| c.current_deployment_name = Some(name))
    }

    /// Map a cluster ref to a kube context
    ///
    /// # Errors
    /// Returns validation errors; the config is left unchanged
    pub fn set_cluster_context(
        &mut self,
        cluster: impl Into<ClusterRef>,
        context: impl Into<String>,
    ) -> Result<(), ModelError> {
        let (cluster, context) = (cluster.into(), context.into());
        self.update(|c| {
            c.cluster_refs.insert(cluster, context);
        })
    }

    /// Replace version pins
    pub fn set_versions(&mut self, versions: LocalVersions) {
        self.versions = versions;
    }

    /// Set one field by dotted path, e.g. `deployments.0.realm`
    ///
    /// # Errors
    /// Returns mapping errors for a bad path or value, or validation errors
    pub fn set_property(&mut self, key: &str, text: &str) -> Result<(), ModelError> {
        let mut value = to_object(&*self)?;
        apply_property_value(&mut value, key, text)?;
        let next: Self = from_object(value)?;
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Check the whole document
    ///
    /// # Errors
    /// Returns every violation found
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if errors.require_non_empty("userEmailAddress", &self.user_email_address)
            && !is_email(&self.user_email_address)
        {
            errors.push(
                "userEmailAddress",
                ViolationKind::Malformed,
                format!("'{}' is not a valid email address", self.user_email_address),
            );
        }

        let mut names = HashSet::new();
        for (i, deployment) in self.deployments.iter().enumerate() {
            let field = format!("deployments.{i}");
            if errors.require_non_empty(format!("{field}.name"), &deployment.name)
                && !names.insert(deployment.name.as_str())
            {
                errors.push(
                    format!("{field}.name"),
                    ViolationKind::Duplicate,
                    format!("deployment '{}' listed twice", deployment.name),
                );
            }
            errors.require_dns_label(format!("{field}.namespace"), &deployment.namespace);
            if deployment.clusters.is_empty() {
                errors.push(
                    format!("{field}.clusters"),
                    ViolationKind::Missing,
                    "deployment needs at least one cluster",
                );
            }
            for (j, cluster) in deployment.clusters.iter().enumerate() {
                let cluster_field = format!("{field}.clusters.{j}");
                if errors.require_non_empty(cluster_field.clone(), cluster.as_str())
                    && !self.cluster_refs.contains_key(cluster)
                {
                    errors.push(
                        cluster_field,
                        ViolationKind::UnknownReference,
                        format!("no context mapped for cluster '{cluster}'"),
                    );
                }
            }
        }

        for (cluster, context) in &self.cluster_refs {
            errors.require_non_empty(format!("clusterRefs.{cluster}"), context);
        }

        if let Some(current) = &self.current_deployment_name {
            if !names.contains(current.as_str()) {
                errors.push(
                    "currentDeploymentName",
                    ViolationKind::UnknownReference,
                    format!("deployment '{current}' does not exist"),
                );
            }
        }

        errors.into_result()
    }
}
