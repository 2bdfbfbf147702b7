//! Derived views joining the remote document with the local context mapping

use std::collections::BTreeMap;

use crate::error::ModelError;
use crate::local::LocalConfig;
use crate::remote::RemoteConfigData;
use crate::types::ClusterRef;

/// Offset between a node id and its account number
const NODE_ACCOUNT_OFFSET: u64 = 3;

/// Consensus node with everything needed to reach it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsensusNode {
    /// Node alias
    pub name: String,
    /// Ledger node id
    pub node_id: u32,
    /// Namespace
    pub namespace: String,
    /// Cluster reference
    pub cluster: ClusterRef,
    /// Kube context of the cluster
    pub context: String,
    /// DNS base domain
    pub dns_base_domain: String,
    /// Service name pattern
    pub dns_consensus_node_pattern: String,
    /// Fully qualified service name
    pub fqdn: String,
    /// Node account, `shard.realm.num`
    pub account_id: String,
}

/// Substitute placeholders in a service name pattern and append the base domain
#[must_use]
pub fn render_fqdn(pattern: &str, base_domain: &str, alias: &str, node_id: u32, namespace: &str, cluster: &str) -> String {
    let host = pattern
        .replace("{nodeAlias}", alias)
        .replace("{nodeId}", &node_id.to_string())
        .replace("{namespace}", namespace)
        .replace("{cluster}", cluster);
    format!("{host}.{base_domain}")
}

/// Consensus nodes of the deployment, by id
///
/// Realm and shard come from the matching local deployment entry, or 0 when
/// the operator has no local entry for it.
///
/// # Errors
/// Returns `ClusterNotFound` if a node's cluster is absent from the document
/// or `ContextNotMapped` if the local config has no context for it
pub fn consensus_nodes(remote: &RemoteConfigData, local: &LocalConfig) -> Result<Vec<ConsensusNode>, ModelError> {
    let (realm, shard) = local
        .deployment(&remote.metadata.deployment_name)
        .map_or((0, 0), |d| (d.realm, d.shard));

    remote
        .components
        .consensus_nodes()
        .map(|node| {
            let base = node.base();
            let cluster = remote
                .cluster(base.cluster())
                .ok_or_else(|| ModelError::ClusterNotFound(base.cluster().clone()))?;
            let context = local
                .context_for(base.cluster())
                .ok_or_else(|| ModelError::ContextNotMapped(base.cluster().clone()))?;
            Ok(ConsensusNode {
                name: base.name().to_string(),
                node_id: node.node_id(),
                namespace: base.namespace().to_string(),
                cluster: base.cluster().clone(),
                context: context.to_string(),
                dns_base_domain: cluster.dns_base_domain.clone(),
                dns_consensus_node_pattern: cluster.dns_consensus_node_pattern.clone(),
                fqdn: render_fqdn(
                    &cluster.dns_consensus_node_pattern,
                    &cluster.dns_base_domain,
                    base.name(),
                    node.node_id(),
                    base.namespace(),
                    base.cluster().as_str(),
                ),
                account_id: format!("{shard}.{realm}.{}", u64::from(node.node_id()) + NODE_ACCOUNT_OFFSET),
            })
        })
        .collect()
}

/// Cluster ref to context mapping for every cluster of the deployment
///
/// # Errors
/// Returns `ContextNotMapped` for a cluster without a local context
pub fn cluster_refs(remote: &RemoteConfigData, local: &LocalConfig) -> Result<BTreeMap<ClusterRef, String>, ModelError> {
    remote
        .clusters
        .iter()
        .map(|cluster| {
            local
                .context_for(&cluster.name)
                .map(|context| (cluster.name.clone(), context.to_string()))
                .ok_or_else(|| ModelError::ContextNotMapped(cluster.name.clone()))
        })
        .collect()
}

/// Distinct kube contexts of the deployment, in cluster order
///
/// # Errors
/// Returns `ContextNotMapped` for a cluster without a local context
pub fn contexts(remote: &RemoteConfigData, local: &LocalConfig) -> Result<Vec<String>, ModelError> {
    let mut contexts: Vec<String> = Vec::new();
    for cluster in &remote.clusters {
        let context = local
            .context_for(&cluster.name)
            .ok_or_else(|| ModelError::ContextNotMapped(cluster.name.clone()))?;
        if !contexts.iter().any(|c| c == context) {
            contexts.push(context.to_string());
        }
    }
    Ok(contexts)
}
