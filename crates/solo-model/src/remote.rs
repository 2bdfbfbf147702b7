//! Remote configuration document
//!
//! The shared source of truth for a deployment, persisted in a ConfigMap in
//! the deployment namespace. One document describes the clusters, the
//! components and their phases, the ledger phase, and the recent command
//! history.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::components::ComponentsDataWrapper;
use crate::error::ModelError;
use crate::phase::LedgerPhase;
use crate::types::{ClusterRef, UserIdentity, DEFAULT_DNS_BASE_DOMAIN, DEFAULT_DNS_CONSENSUS_NODE_PATTERN};
use crate::validation::{ValidationErrors, ViolationKind};

/// Default bound on the command history
pub const MAX_COMMAND_HISTORY: usize = 50;

/// Current remote config schema version
pub const REMOTE_CONFIG_SCHEMA_VERSION: u32 = 2;

/// Document bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfigMetadata {
    /// Deployment namespace
    pub namespace: String,
    /// Deployment name
    pub deployment_name: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last write time
    pub last_updated_at: DateTime<Utc>,
    /// Last writer
    pub last_updated_by: UserIdentity,
}

impl RemoteConfigMetadata {
    /// Create metadata for a new document
    #[must_use]
    pub fn new(
        namespace: impl Into<String>,
        deployment_name: impl Into<String>,
        by: UserIdentity,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            deployment_name: deployment_name.into(),
            created_at: at,
            last_updated_at: at,
            last_updated_by: by,
        }
    }
}

/// Versions of the tools and charts that built the deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationVersions {
    /// CLI version
    pub cli: String,
    /// Solo chart version
    pub chart: String,
    /// Consensus node software version
    pub consensus_node: String,
    /// Mirror node chart version
    pub mirror_node_chart: String,
    /// Explorer chart version
    pub explorer_chart: String,
    /// Relay chart version
    pub relay_chart: String,
}

impl Default for ApplicationVersions {
    fn default() -> Self {
        let unknown = || "0.0.0".to_string();
        Self {
            cli: unknown(),
            chart: unknown(),
            consensus_node: unknown(),
            mirror_node_chart: unknown(),
            explorer_chart: unknown(),
            relay_chart: unknown(),
        }
    }
}

/// Cluster participating in the deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    /// Cluster reference
    pub name: ClusterRef,
    /// Namespace in this cluster
    pub namespace: String,
    /// Deployment name
    pub deployment: String,
    /// DNS base domain of the cluster
    #[serde(default = "default_dns_base_domain")]
    pub dns_base_domain: String,
    /// Service name pattern for consensus nodes
    #[serde(default = "default_dns_consensus_node_pattern")]
    pub dns_consensus_node_pattern: String,
}

fn default_dns_base_domain() -> String {
    DEFAULT_DNS_BASE_DOMAIN.to_string()
}

fn default_dns_consensus_node_pattern() -> String {
    DEFAULT_DNS_CONSENSUS_NODE_PATTERN.to_string()
}

impl Cluster {
    /// Create cluster entry with default DNS settings
    #[must_use]
    pub fn new(
        name: impl Into<ClusterRef>,
        namespace: impl Into<String>,
        deployment: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            deployment: deployment.into(),
            dns_base_domain: default_dns_base_domain(),
            dns_consensus_node_pattern: default_dns_consensus_node_pattern(),
        }
    }

    /// Override DNS settings
    #[must_use]
    pub fn with_dns(mut self, base_domain: impl Into<String>, node_pattern: impl Into<String>) -> Self {
        self.dns_base_domain = base_domain.into();
        self.dns_consensus_node_pattern = node_pattern.into();
        self
    }
}

/// Remote config document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfigData {
    schema_version: u32,
    /// Document bookkeeping
    pub metadata: RemoteConfigMetadata,
    /// Tool and chart versions
    #[serde(default)]
    pub versions: ApplicationVersions,
    /// Participating clusters
    #[serde(default)]
    pub clusters: Vec<Cluster>,
    /// Deployed components
    #[serde(default)]
    pub components: ComponentsDataWrapper,
    #[serde(default)]
    ledger_phase: LedgerPhase,
    #[serde(default)]
    command_history: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_executed_command: Option<String>,
}

impl RemoteConfigData {
    /// Create a document at the current schema version
    #[must_use]
    pub fn new(metadata: RemoteConfigMetadata, versions: ApplicationVersions, clusters: Vec<Cluster>) -> Self {
        Self {
            schema_version: REMOTE_CONFIG_SCHEMA_VERSION,
            metadata,
            versions,
            clusters,
            components: ComponentsDataWrapper::new(),
            ledger_phase: LedgerPhase::Uninitialized,
            command_history: Vec::new(),
            last_executed_command: None,
        }
    }

    /// Set the starting ledger phase of a new document
    #[must_use]
    pub fn with_ledger_phase(mut self, phase: LedgerPhase) -> Self {
        self.ledger_phase = phase;
        self
    }

    /// Declared schema version
    #[inline]
    #[must_use]
    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    /// Ledger phase
    #[inline]
    #[must_use]
    pub fn ledger_phase(&self) -> LedgerPhase {
        self.ledger_phase
    }

    /// Move the ledger to a new phase
    ///
    /// # Errors
    /// Returns `IllegalLedgerTransition` if the step is not allowed
    pub fn set_ledger_phase(&mut self, phase: LedgerPhase) -> Result<(), ModelError> {
        self.ledger_phase.validate_transition(phase)?;
        self.ledger_phase = phase;
        Ok(())
    }

    /// Recorded commands, oldest first
    #[inline]
    #[must_use]
    pub fn command_history(&self) -> &[String] {
        &self.command_history
    }

    /// Most recent command
    #[must_use]
    pub fn last_executed_command(&self) -> Option<&str> {
        self.last_executed_command.as_deref()
    }

    /// Record a command, evicting the oldest beyond `max` entries
    pub fn add_command_to_history(&mut self, command: impl Into<String>, max: usize) {
        let command = command.into();
        self.last_executed_command = Some(command.clone());
        self.command_history.push(command);
        if self.command_history.len() > max {
            let excess = self.command_history.len() - max;
            self.command_history.drain(..excess);
        }
    }

    /// Look up a cluster entry
    #[must_use]
    pub fn cluster(&self, name: &ClusterRef) -> Option<&Cluster> {
        self.clusters.iter().find(|c| &c.name == name)
    }

    /// Insert or replace a cluster entry
    pub fn upsert_cluster(&mut self, cluster: Cluster) {
        match self.clusters.iter_mut().find(|c| c.name == cluster.name) {
            Some(existing) => *existing = cluster,
            None => self.clusters.push(cluster),
        }
    }

    /// Stamp the last writer
    pub fn touch(&mut self, by: UserIdentity, at: DateTime<Utc>) {
        self.metadata.last_updated_by = by;
        self.metadata.last_updated_at = at;
    }

    /// Check document consistency
    ///
    /// # Errors
    /// Returns every violation found
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        errors.require_dns_label("metadata.namespace", &self.metadata.namespace);
        errors.require_non_empty("metadata.deploymentName", &self.metadata.deployment_name);

        let mut names = HashSet::new();
        for (i, cluster) in self.clusters.iter().enumerate() {
            if errors.require_non_empty(format!("clusters.{i}.name"), cluster.name.as_str())
                && !names.insert(&cluster.name)
            {
                errors.push(
                    format!("clusters.{i}.name"),
                    ViolationKind::Duplicate,
                    format!("cluster '{}' listed twice", cluster.name),
                );
            }
            errors.require_dns_label(format!("clusters.{i}.namespace"), &cluster.namespace);
            errors.require_non_empty(format!("clusters.{i}.dnsBaseDomain"), &cluster.dns_base_domain);
            errors.require_non_empty(
                format!("clusters.{i}.dnsConsensusNodePattern"),
                &cluster.dns_consensus_node_pattern,
            );
        }

        let mut node_ids = BTreeSet::new();
        for node in self.components.consensus_nodes() {
            if !node_ids.insert(node.node_id()) {
                errors.push(
                    format!("components.consensusNodes.{}", node.base().id()),
                    ViolationKind::Duplicate,
                    format!("node id {} used twice", node.node_id()),
                );
            }
        }

        for component in self.components.iter() {
            let field = format!("components.{}.{}", component.component_type(), component.id());
            if !names.contains(component.cluster()) {
                errors.push(
                    format!("{field}.cluster"),
                    ViolationKind::UnknownReference,
                    format!("cluster '{}' is not part of the deployment", component.cluster()),
                );
            }
            errors.require_dns_label(format!("{field}.namespace"), component.namespace());
            if let Some(relay) = component.as_relay() {
                for node_id in relay.consensus_node_ids() {
                    if !node_ids.contains(node_id) {
                        errors.push(
                            format!("{field}.consensusNodeIds"),
                            ViolationKind::UnknownReference,
                            format!("no consensus node with node id {node_id}"),
                        );
                    }
                }
            }
        }

        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{BaseComponent, ConsensusNodeComponent, RelayComponent};
    use crate::phase::DeploymentPhase;
    use crate::types::ComponentId;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn doc() -> RemoteConfigData {
        RemoteConfigData::new(
            RemoteConfigMetadata::new("solo", "deployment", UserIdentity::new("john", "host"), at()),
            ApplicationVersions::default(),
            vec![Cluster::new("cluster-1", "solo", "deployment")],
        )
    }

    fn node(id: u32, cluster: &str) -> ConsensusNodeComponent {
        ConsensusNodeComponent::new(
            BaseComponent::new(
                ComponentId::new(id),
                format!("node{}", id + 1),
                ClusterRef::new(cluster),
                "solo",
                DeploymentPhase::Requested,
            ),
            id,
        )
    }

    #[test]
    fn new_document_is_valid() {
        let doc = doc();
        assert_eq!(doc.schema_version(), REMOTE_CONFIG_SCHEMA_VERSION);
        assert_eq!(doc.ledger_phase(), LedgerPhase::Uninitialized);
        doc.validate().unwrap();
    }

    #[test]
    fn history_evicts_oldest() {
        let mut doc = doc();
        for i in 0..5 {
            doc.add_command_to_history(format!("cmd {i}"), 3);
        }
        assert_eq!(doc.command_history(), &["cmd 2", "cmd 3", "cmd 4"]);
        assert_eq!(doc.last_executed_command(), Some("cmd 4"));
    }

    #[test]
    fn ledger_phase_transitions_checked() {
        let mut doc = doc();
        assert!(doc.set_ledger_phase(LedgerPhase::Freezing).is_err());
        doc.set_ledger_phase(LedgerPhase::Initialized).unwrap();
        doc.set_ledger_phase(LedgerPhase::Freezing).unwrap();
        assert_eq!(doc.ledger_phase(), LedgerPhase::Freezing);
    }

    #[test]
    fn validate_catches_dangling_references() {
        let mut doc = doc();
        doc.components.add_new_component(node(0, "cluster-1")).unwrap();
        doc.components.add_new_component(node(1, "cluster-9")).unwrap();
        doc.components
            .add_new_component(RelayComponent::new(
                BaseComponent::new(
                    ComponentId::new(0),
                    "relay",
                    ClusterRef::new("cluster-1"),
                    "solo",
                    DeploymentPhase::Requested,
                ),
                vec![0, 5],
            ))
            .unwrap();

        let errors = doc.validate().unwrap_err();
        assert_eq!(
            errors.on_field("components.consensus-node.1.cluster").map(|v| v.kind),
            Some(ViolationKind::UnknownReference)
        );
        assert_eq!(
            errors.on_field("components.relay.0.consensusNodeIds").map(|v| v.kind),
            Some(ViolationKind::UnknownReference)
        );
        assert_eq!(errors.violations().len(), 2);
    }

    #[test]
    fn duplicate_cluster_names_rejected() {
        let mut doc = doc();
        doc.clusters.push(Cluster::new("cluster-1", "solo", "deployment"));
        let errors = doc.validate().unwrap_err();
        assert_eq!(
            errors.on_field("clusters.1.name").map(|v| v.kind),
            Some(ViolationKind::Duplicate)
        );

        let mut doc = self::doc();
        doc.upsert_cluster(Cluster::new("cluster-1", "other", "deployment"));
        assert_eq!(doc.clusters.len(), 1);
        assert_eq!(doc.cluster(&"cluster-1".into()).unwrap().namespace, "other");
    }

    #[test]
    fn serde_round_trip() {
        let mut doc = doc().with_ledger_phase(LedgerPhase::Initialized);
        doc.components.add_new_component(node(0, "cluster-1")).unwrap();
        doc.add_command_to_history("solo deployment create", MAX_COMMAND_HISTORY);

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["ledgerPhase"], serde_json::json!("initialized"));
        assert_eq!(value["metadata"]["lastUpdatedBy"]["name"], serde_json::json!("john"));
        let back: RemoteConfigData = serde_json::from_value(value).unwrap();
        assert_eq!(back, doc);
    }

    proptest! {
        #[test]
        fn history_never_exceeds_bound(count in 0usize..120, max in 1usize..60) {
            let mut doc = doc();
            for i in 0..count {
                doc.add_command_to_history(format!("cmd {i}"), max);
            }
            prop_assert_eq!(doc.command_history().len(), count.min(max));
            if count > 0 {
                let last = format!("cmd {}", count - 1);
                prop_assert_eq!(doc.command_history().last(), Some(&last));
                let first = format!("cmd {}", count.saturating_sub(max));
                prop_assert_eq!(doc.command_history().first(), Some(&first));
            }
        }
    }
}
