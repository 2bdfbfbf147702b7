//! Remote config load, create and guarded modification

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use solo_mapper::{from_yaml_str, to_yaml_string};
use solo_model::schemas::remote_config_schema;
use solo_model::{
    BaseComponent, Cluster, ClusterRef, ComponentId, ConsensusNode, ConsensusNodeComponent, DeploymentPhase,
    LedgerPhase, LocalConfig, RemoteConfigData, RemoteConfigMetadata, UserIdentity,
};
use solo_schema::Schema;

use super::validator::RemoteConfigValidator;
use super::{REMOTE_CONFIG_DATA_KEY, REMOTE_CONFIG_LABEL_KEY, REMOTE_CONFIG_LABEL_VALUE, REMOTE_CONFIG_NAME};
use crate::config::Settings;
use crate::error::{K8Error, RemoteConfigError};
use crate::k8::{ConfigMap, K8Client, Target};
use crate::lock::{LeaseRenewal, LockManager};

/// Parameters of a new remote config
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    /// Deployment name
    pub deployment_name: String,
    /// Cluster hosting the remote config
    pub cluster: ClusterRef,
    /// Command recorded as the first history entry
    pub command: String,
    /// Consensus node aliases, registered in `Requested`
    pub node_aliases: Vec<String>,
    /// Starting ledger phase
    pub ledger_phase: LedgerPhase,
    /// DNS base domain override
    pub dns_base_domain: Option<String>,
    /// Consensus node service pattern override
    pub dns_consensus_node_pattern: Option<String>,
}

impl CreateRequest {
    /// Create request without nodes
    #[must_use]
    pub fn new(deployment_name: impl Into<String>, cluster: impl Into<ClusterRef>, command: impl Into<String>) -> Self {
        Self {
            deployment_name: deployment_name.into(),
            cluster: cluster.into(),
            command: command.into(),
            node_aliases: Vec::new(),
            ledger_phase: LedgerPhase::Uninitialized,
            dns_base_domain: None,
            dns_consensus_node_pattern: None,
        }
    }

    /// With consensus node aliases
    #[must_use]
    pub fn with_node_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.node_aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    /// With starting ledger phase
    #[inline]
    #[must_use]
    pub fn with_ledger_phase(mut self, phase: LedgerPhase) -> Self {
        self.ledger_phase = phase;
        self
    }

    /// With DNS settings
    #[must_use]
    pub fn with_dns(mut self, base_domain: impl Into<String>, node_pattern: impl Into<String>) -> Self {
        self.dns_base_domain = Some(base_domain.into());
        self.dns_consensus_node_pattern = Some(node_pattern.into());
        self
    }
}

/// Document read from the cluster
struct Loaded {
    config_map: ConfigMap,
    data: RemoteConfigData,
    migrated: bool,
}

/// Remote config manager
///
/// Holds at most one loaded document. Every write goes through
/// [`modify`](Self::modify), which serializes writers with a lease and
/// always starts from the stored document.
#[derive(Debug)]
pub struct RemoteConfigManager {
    k8: Arc<dyn K8Client>,
    locks: Arc<dyn LockManager>,
    validator: RemoteConfigValidator,
    settings: Settings,
    identity: UserIdentity,
    schema: Schema<RemoteConfigData>,
    cache: RwLock<Option<Arc<RemoteConfigData>>>,
}

impl RemoteConfigManager {
    /// Create manager
    ///
    /// # Errors
    /// Returns `Schema` if the remote config migration chain is broken
    pub fn new(
        k8: Arc<dyn K8Client>,
        locks: Arc<dyn LockManager>,
        settings: Settings,
        identity: UserIdentity,
    ) -> Result<Self, RemoteConfigError> {
        Ok(Self {
            validator: RemoteConfigValidator::new(k8.clone()),
            k8,
            locks,
            settings,
            identity,
            schema: remote_config_schema()?,
            cache: RwLock::new(None),
        })
    }

    /// Check if a document is cached
    #[inline]
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.cache.read().is_some()
    }

    /// Drop the cached document
    pub fn unload(&self) {
        *self.cache.write() = None;
    }

    /// Cached document, if any
    #[must_use]
    pub fn cached(&self) -> Option<Arc<RemoteConfigData>> {
        self.cache.read().clone()
    }

    fn store(&self, data: RemoteConfigData) -> Arc<RemoteConfigData> {
        let data = Arc::new(data);
        *self.cache.write() = Some(data.clone());
        data
    }

    fn selector() -> String {
        format!("{REMOTE_CONFIG_LABEL_KEY}={REMOTE_CONFIG_LABEL_VALUE}")
    }

    async fn find(&self, target: &Target) -> Result<Option<ConfigMap>, RemoteConfigError> {
        let mut found = self.k8.list_config_maps(target, &Self::selector()).await?;
        match found.len() {
            0 => Ok(None),
            1 => Ok(found.pop()),
            count => Err(RemoteConfigError::Ambiguous {
                namespace: target.namespace.clone(),
                count,
            }),
        }
    }

    async fn fetch(&self, target: &Target) -> Result<Loaded, RemoteConfigError> {
        let config_map = self.find(target).await?.ok_or_else(|| RemoteConfigError::NotFound {
            namespace: target.namespace.clone(),
            context: target.context.clone(),
        })?;
        let payload = config_map
            .data
            .get(REMOTE_CONFIG_DATA_KEY)
            .ok_or_else(|| RemoteConfigError::MissingPayload {
                namespace: config_map.namespace.clone(),
                name: config_map.name.clone(),
                key: REMOTE_CONFIG_DATA_KEY,
            })?;

        let (data, report) = self.schema.transform_with_report(&from_yaml_str(payload)?)?;
        if report.is_migrated() {
            tracing::info!(
                namespace = %target.namespace,
                from = %report.from,
                applied = ?report.applied,
                "remote config migrated"
            );
        }
        Ok(Loaded {
            config_map,
            data,
            migrated: report.is_migrated(),
        })
    }

    fn render(&self, data: &RemoteConfigData) -> Result<String, RemoteConfigError> {
        Ok(to_yaml_string(&self.schema.encode(data)?)?)
    }

    /// Cached document, loading it from the cluster on first use
    ///
    /// # Errors
    /// Returns `NotFound` if the namespace has no remote config, or the
    /// parse, migration or cluster error that stopped the load
    #[tracing::instrument(skip(self), fields(context = %target.context, namespace = %target.namespace))]
    pub async fn get(&self, target: &Target) -> Result<Arc<RemoteConfigData>, RemoteConfigError> {
        if let Some(cached) = self.cached() {
            return Ok(cached);
        }
        let loaded = self.fetch(target).await?;
        tracing::info!(components = loaded.data.components.len(), "remote config loaded");
        Ok(self.store(loaded.data))
    }

    /// Write a new remote config for a deployment
    ///
    /// # Errors
    /// Returns `AlreadyExists` if the namespace already has one, or
    /// `Validation` if the request produces an invalid document
    #[tracing::instrument(skip(self, request, local), fields(context = %target.context, namespace = %target.namespace))]
    pub async fn create(
        &self,
        target: &Target,
        request: CreateRequest,
        local: &LocalConfig,
    ) -> Result<Arc<RemoteConfigData>, RemoteConfigError> {
        let already_exists = || RemoteConfigError::AlreadyExists {
            namespace: target.namespace.clone(),
            context: target.context.clone(),
        };
        if self.find(target).await?.is_some() {
            return Err(already_exists());
        }

        let data = self.new_document(target, request, local)?;
        let config_map = ConfigMap::new(REMOTE_CONFIG_NAME, &target.namespace)
            .with_label(REMOTE_CONFIG_LABEL_KEY, REMOTE_CONFIG_LABEL_VALUE)
            .with_data(REMOTE_CONFIG_DATA_KEY, self.render(&data)?);

        match self.k8.create_config_map(&target.context, &config_map).await {
            Ok(_) => {}
            Err(e) if e.is_already_exists() => return Err(already_exists()),
            Err(e) => return Err(e.into()),
        }
        tracing::info!(deployment = %data.metadata.deployment_name, "remote config created");
        Ok(self.store(data))
    }

    fn new_document(
        &self,
        target: &Target,
        request: CreateRequest,
        local: &LocalConfig,
    ) -> Result<RemoteConfigData, RemoteConfigError> {
        let mut versions = self.settings.versions.clone();
        versions.cli.clone_from(&local.versions().cli);
        if let Some(chart) = &local.versions().chart {
            versions.chart.clone_from(chart);
        }

        let cluster = Cluster::new(request.cluster.clone(), &target.namespace, &request.deployment_name).with_dns(
            request
                .dns_base_domain
                .unwrap_or_else(|| self.settings.dns_base_domain.clone()),
            request
                .dns_consensus_node_pattern
                .unwrap_or_else(|| self.settings.dns_consensus_node_pattern.clone()),
        );
        let metadata = RemoteConfigMetadata::new(
            &target.namespace,
            &request.deployment_name,
            self.identity.clone(),
            Utc::now(),
        );

        let mut data = RemoteConfigData::new(metadata, versions, vec![cluster])
            .with_ledger_phase(request.ledger_phase);
        for (node_id, alias) in (0u32..).zip(request.node_aliases) {
            let base = BaseComponent::new(
                ComponentId::new(node_id),
                alias,
                request.cluster.clone(),
                &target.namespace,
                DeploymentPhase::Requested,
            );
            data.components
                .add_new_component(ConsensusNodeComponent::new(base, node_id))?;
        }
        data.add_command_to_history(request.command, self.settings.max_command_history);
        data.validate()?;
        Ok(data)
    }

    /// Change the remote config under the deployment lease
    ///
    /// The callback receives the document as currently stored in the
    /// cluster and returns the new document. If it fails, nothing is
    /// written. An unchanged document is not written either.
    ///
    /// # Errors
    /// Returns the callback's error, `Lock` if the lease cannot be acquired
    /// or was lost, `Validation` if the new document is invalid, or the
    /// cluster error of the final write
    #[tracing::instrument(skip(self, callback), fields(context = %target.context, namespace = %target.namespace))]
    pub async fn modify<F, Fut>(&self, target: &Target, callback: F) -> Result<Arc<RemoteConfigData>, RemoteConfigError>
    where
        F: FnOnce(RemoteConfigData) -> Fut + Send,
        Fut: Future<Output = Result<RemoteConfigData, RemoteConfigError>> + Send,
    {
        let lease = self.locks.acquire(target).await?;
        let renewal = LeaseRenewal::spawn(self.locks.clone(), lease.clone());

        let outcome = self.modify_leased(target, callback, &renewal).await;

        renewal.stop().await;
        if let Err(e) = self.locks.release(&lease).await {
            tracing::warn!(error = %e, "failed to release lease");
        }
        outcome
    }

    async fn modify_leased<F, Fut>(
        &self,
        target: &Target,
        callback: F,
        renewal: &LeaseRenewal,
    ) -> Result<Arc<RemoteConfigData>, RemoteConfigError>
    where
        F: FnOnce(RemoteConfigData) -> Fut + Send,
        Fut: Future<Output = Result<RemoteConfigData, RemoteConfigError>> + Send,
    {
        let Loaded {
            mut config_map,
            data: current,
            migrated,
        } = self.fetch(target).await?;

        let mut updated = callback(current.clone()).await?;
        renewal.check()?;
        updated.validate()?;

        if updated == current && !migrated {
            tracing::debug!("remote config unchanged, skipping write");
            return Ok(self.store(current));
        }

        updated.touch(self.identity.clone(), Utc::now());
        let payload = self.render(&updated)?;
        let digest = hex::encode(Sha256::digest(payload.as_bytes()));
        config_map.data.insert(REMOTE_CONFIG_DATA_KEY.to_string(), payload);

        renewal.check()?;
        self.k8
            .replace_config_map(&target.context, &config_map)
            .await
            .map_err(|e| match e {
                K8Error::NotFound { .. } => RemoteConfigError::NotFound {
                    namespace: target.namespace.clone(),
                    context: target.context.clone(),
                },
                other => other.into(),
            })?;
        tracing::info!(digest = %&digest[..16], "remote config persisted");
        Ok(self.store(updated))
    }

    /// Load the remote config, record `command`, and optionally check the
    /// recorded components against running pods
    ///
    /// # Errors
    /// Returns load and write errors from [`modify`](Self::modify), or
    /// `Validator` if a component is missing from its cluster
    #[tracing::instrument(skip(self, local), fields(context = %target.context, namespace = %target.namespace))]
    pub async fn load_and_validate(
        &self,
        target: &Target,
        command: &str,
        validate: bool,
        skip_consensus_nodes: bool,
        local: &LocalConfig,
    ) -> Result<Arc<RemoteConfigData>, RemoteConfigError> {
        let command = command.to_string();
        let max = self.settings.max_command_history;
        let data = self
            .modify(target, move |mut data| async move {
                data.add_command_to_history(command, max);
                Ok(data)
            })
            .await?;

        if validate {
            let contexts = solo_model::cluster_refs(&data, local)?;
            self.validator
                .validate_components(&data.components, &contexts, skip_consensus_nodes)
                .await?;
        }
        Ok(data)
    }

    fn loaded(&self) -> Result<Arc<RemoteConfigData>, RemoteConfigError> {
        self.cached().ok_or(RemoteConfigError::NotLoaded)
    }

    /// Consensus nodes of the loaded document with their contexts
    ///
    /// # Errors
    /// Returns `NotLoaded` before the first load, or `Model` if a node's
    /// cluster cannot be resolved
    pub fn consensus_nodes(&self, local: &LocalConfig) -> Result<Vec<ConsensusNode>, RemoteConfigError> {
        let data = self.loaded()?;
        Ok(solo_model::consensus_nodes(&data, local)?)
    }

    /// Distinct kube contexts of the loaded document
    ///
    /// # Errors
    /// Returns `NotLoaded` before the first load, or `Model` for an
    /// unmapped cluster
    pub fn contexts(&self, local: &LocalConfig) -> Result<Vec<String>, RemoteConfigError> {
        let data = self.loaded()?;
        Ok(solo_model::contexts(&data, local)?)
    }

    /// Cluster ref to context mapping of the loaded document
    ///
    /// # Errors
    /// Returns `NotLoaded` before the first load, or `Model` for an
    /// unmapped cluster
    pub fn cluster_refs(&self, local: &LocalConfig) -> Result<BTreeMap<ClusterRef, String>, RemoteConfigError> {
        let data = self.loaded()?;
        Ok(solo_model::cluster_refs(&data, local)?)
    }

    /// Remove every component from the remote config
    ///
    /// # Errors
    /// Returns errors from [`modify`](Self::modify)
    pub async fn delete_components(&self, target: &Target) -> Result<Arc<RemoteConfigData>, RemoteConfigError> {
        self.modify(target, |mut data| async move {
            data.components.clear();
            Ok(data)
        })
        .await
    }

    /// Delete the remote config ConfigMap
    ///
    /// # Errors
    /// Returns `NotFound` if there is nothing to delete
    #[tracing::instrument(skip(self), fields(context = %target.context, namespace = %target.namespace))]
    pub async fn delete(&self, target: &Target) -> Result<(), RemoteConfigError> {
        let lease = self.locks.acquire(target).await?;
        let outcome = self.delete_leased(target).await;
        if let Err(e) = self.locks.release(&lease).await {
            tracing::warn!(error = %e, "failed to release lease");
        }
        outcome
    }

    async fn delete_leased(&self, target: &Target) -> Result<(), RemoteConfigError> {
        let config_map = self.find(target).await?.ok_or_else(|| RemoteConfigError::NotFound {
            namespace: target.namespace.clone(),
            context: target.context.clone(),
        })?;
        self.k8.delete_config_map(target, &config_map.name, None).await?;
        self.unload();
        tracing::info!("remote config deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8::MockK8Client;
    use crate::lock::LocalLockManager;
    use solo_model::{ComponentType, Deployment};

    fn local() -> LocalConfig {
        let mut local = LocalConfig::new("john@doe.com", UserIdentity::new("john", "host")).unwrap();
        local.set_cluster_context(ClusterRef::new("c1"), "kind-c1").unwrap();
        local
            .add_deployment(Deployment::new("dep", "solo", vec![ClusterRef::new("c1")]))
            .unwrap();
        local
    }

    fn manager(k8: MockK8Client) -> RemoteConfigManager {
        let settings = Settings::default();
        RemoteConfigManager::new(
            Arc::new(k8),
            Arc::new(LocalLockManager::new(settings.lock, "john@host")),
            settings,
            UserIdentity::new("john", "host"),
        )
        .unwrap()
    }

    #[test]
    fn create_request_defaults() {
        let request = CreateRequest::new("dep", "c1", "solo deployment create").with_node_aliases(["node1", "node2"]);
        assert_eq!(request.ledger_phase, LedgerPhase::Uninitialized);
        assert_eq!(request.node_aliases, vec!["node1".to_string(), "node2".to_string()]);
        assert_eq!(request.dns_base_domain, None);
    }

    #[test]
    fn new_document_registers_requested_nodes() {
        let manager = manager(MockK8Client::new());
        let request = CreateRequest::new("dep", "c1", "solo deployment create")
            .with_node_aliases(["node1", "node2"])
            .with_dns("example.com", "{nodeAlias}.{namespace}");
        let data = manager
            .new_document(&Target::new("kind-c1", "solo"), request, &local())
            .unwrap();

        assert_eq!(data.components.len(), 2);
        let node2 = data
            .components
            .get_component(ComponentType::ConsensusNode, ComponentId::new(1))
            .unwrap();
        assert_eq!(node2.name(), "node2");
        assert_eq!(node2.phase(), DeploymentPhase::Requested);
        assert_eq!(data.clusters[0].dns_base_domain, "example.com");
        assert_eq!(data.last_executed_command(), Some("solo deployment create"));
    }

    #[test]
    fn projections_need_a_loaded_document() {
        let manager = manager(MockK8Client::new());
        assert!(!manager.is_loaded());
        assert!(matches!(manager.contexts(&local()), Err(RemoteConfigError::NotLoaded)));
    }

    #[tokio::test]
    async fn ambiguous_config_maps_are_rejected() {
        let mut k8 = MockK8Client::new();
        k8.expect_list_config_maps().returning(|target, _| {
            Ok(vec![
                ConfigMap::new("a", target.namespace.clone()),
                ConfigMap::new("b", target.namespace.clone()),
            ])
        });
        let err = manager(k8).get(&Target::new("kind-c1", "solo")).await.unwrap_err();
        assert!(matches!(err, RemoteConfigError::Ambiguous { count: 2, .. }));
    }

    #[tokio::test]
    async fn missing_payload_is_reported() {
        let mut k8 = MockK8Client::new();
        k8.expect_list_config_maps()
            .returning(|target, _| Ok(vec![ConfigMap::new(REMOTE_CONFIG_NAME, target.namespace.clone())]));
        let err = manager(k8).get(&Target::new("kind-c1", "solo")).await.unwrap_err();
        assert!(matches!(err, RemoteConfigError::MissingPayload { .. }));
    }

    #[tokio::test]
    async fn create_race_reports_already_exists() {
        let mut k8 = MockK8Client::new();
        k8.expect_list_config_maps().returning(|_, _| Ok(Vec::new()));
        k8.expect_create_config_map()
            .returning(|_, cm| Err(K8Error::already_exists("ConfigMap", cm.namespace.clone(), cm.name.clone())));
        let manager = manager(k8);
        let err = manager
            .create(
                &Target::new("kind-c1", "solo"),
                CreateRequest::new("dep", "c1", "solo deployment create"),
                &local(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteConfigError::AlreadyExists { .. }));
        assert!(!manager.is_loaded());
    }
}
