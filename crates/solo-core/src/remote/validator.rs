//! Cross-check of the remote config against running pods

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::try_join_all;
use solo_model::{ClusterRef, Component, ComponentType, ComponentsDataWrapper};

use crate::error::ValidatorError;
use crate::k8::{K8Client, Target};

/// Label carrying a consensus node's alias on its pods
pub const NODE_NAME_LABEL: &str = "solo.hedera.com/node-name";

/// Checks that every recorded component has pods in its cluster
#[derive(Debug, Clone)]
pub struct RemoteConfigValidator {
    k8: Arc<dyn K8Client>,
}

impl RemoteConfigValidator {
    /// Create validator
    #[must_use]
    pub fn new(k8: Arc<dyn K8Client>) -> Self {
        Self { k8 }
    }

    /// Validate every component that should be running
    ///
    /// Components in `Requested` or `Stopped` have no pods and are skipped.
    /// Checks run concurrently; the first failure fails the whole.
    ///
    /// # Errors
    /// Returns `ComponentNotFound` for a component without pods or
    /// `ContextNotMapped` for a cluster missing from `contexts`
    #[tracing::instrument(skip_all, fields(components = components.len()))]
    pub async fn validate_components(
        &self,
        components: &ComponentsDataWrapper,
        contexts: &BTreeMap<ClusterRef, String>,
        skip_consensus_nodes: bool,
    ) -> Result<(), ValidatorError> {
        let checks = components
            .iter()
            .filter(|c| c.phase().expects_pods())
            .filter(|c| !(skip_consensus_nodes && c.component_type() == ComponentType::ConsensusNode))
            .map(|component| {
                let context = contexts
                    .get(component.cluster())
                    .ok_or_else(|| ValidatorError::ContextNotMapped(component.cluster().clone()))?;
                Ok(self.check(component, Target::new(context.as_str(), component.namespace())))
            })
            .collect::<Result<Vec<_>, ValidatorError>>()?;

        let checked = checks.len();
        try_join_all(checks).await?;
        tracing::debug!(checked, "remote config matches cluster");
        Ok(())
    }

    async fn check(&self, component: &Component, target: Target) -> Result<(), ValidatorError> {
        let selector = pod_selector(component);
        let pods = self.k8.list_pods(&target, &selector).await?;
        if pods.is_empty() {
            tracing::warn!(component = component.name(), selector = %selector, "no pods found");
            return Err(ValidatorError::ComponentNotFound {
                component_type: component.component_type(),
                name: component.name().to_string(),
                namespace: target.namespace,
                cluster: component.cluster().clone(),
            });
        }
        Ok(())
    }
}

/// Label selector for a component's pods
///
/// Consensus nodes are matched individually by alias; other types by type.
#[must_use]
pub fn pod_selector(component: &Component) -> String {
    let by_type = component.component_type().pod_label_selector();
    match component.component_type() {
        ComponentType::ConsensusNode => format!("{by_type},{NODE_NAME_LABEL}={}", component.name()),
        _ => by_type.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8::{MockK8Client, Pod};
    use solo_model::{BaseComponent, ComponentId, ConsensusNodeComponent, DeploymentPhase, MirrorNodeComponent};

    fn base(id: u32, name: &str, phase: DeploymentPhase) -> BaseComponent {
        BaseComponent::new(ComponentId::new(id), name, ClusterRef::new("c1"), "solo", phase)
    }

    fn contexts() -> BTreeMap<ClusterRef, String> {
        BTreeMap::from([(ClusterRef::new("c1"), "kind-c1".to_string())])
    }

    #[test]
    fn consensus_node_selector_names_the_node() {
        let node: Component = ConsensusNodeComponent::new(base(0, "node1", DeploymentPhase::Started), 0).into();
        assert_eq!(
            pod_selector(&node),
            "solo.hedera.com/type=network-node,solo.hedera.com/node-name=node1"
        );
        let mirror: Component = MirrorNodeComponent::new(base(0, "mirror", DeploymentPhase::Started)).into();
        assert_eq!(pod_selector(&mirror), "app.kubernetes.io/name=importer");
    }

    #[tokio::test]
    async fn missing_pods_are_reported() {
        let mut components = ComponentsDataWrapper::new();
        components
            .add_new_component(MirrorNodeComponent::new(base(0, "mirror", DeploymentPhase::Deployed)))
            .unwrap();

        let mut k8 = MockK8Client::new();
        k8.expect_list_pods().returning(|_, _| Ok(Vec::new()));
        let validator = RemoteConfigValidator::new(Arc::new(k8));

        let err = validator
            .validate_components(&components, &contexts(), false)
            .await
            .unwrap_err();
        match err {
            ValidatorError::ComponentNotFound {
                component_type,
                name,
                namespace,
                cluster,
            } => {
                assert_eq!(component_type, ComponentType::MirrorNode);
                assert_eq!(name, "mirror");
                assert_eq!(namespace, "solo");
                assert_eq!(cluster, ClusterRef::new("c1"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn requested_and_skipped_components_are_not_checked() {
        let mut components = ComponentsDataWrapper::new();
        components
            .add_new_component(ConsensusNodeComponent::new(base(0, "node1", DeploymentPhase::Started), 0))
            .unwrap();
        components
            .add_new_component(ConsensusNodeComponent::new(base(1, "node2", DeploymentPhase::Requested), 1))
            .unwrap();

        let mut k8 = MockK8Client::new();
        k8.expect_list_pods().never();
        let validator = RemoteConfigValidator::new(Arc::new(k8));

        validator
            .validate_components(&components, &contexts(), true)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn running_components_pass() {
        let mut components = ComponentsDataWrapper::new();
        components
            .add_new_component(ConsensusNodeComponent::new(base(0, "node1", DeploymentPhase::Started), 0))
            .unwrap();

        let mut k8 = MockK8Client::new();
        k8.expect_list_pods()
            .withf(|target, selector| target.context == "kind-c1" && selector.ends_with("node-name=node1"))
            .times(1)
            .returning(|target, _| Ok(vec![Pod::new("network-node1-0", target.namespace.clone())]));
        let validator = RemoteConfigValidator::new(Arc::new(k8));

        validator
            .validate_components(&components, &contexts(), false)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unmapped_cluster_fails_before_any_call() {
        let mut components = ComponentsDataWrapper::new();
        components
            .add_new_component(MirrorNodeComponent::new(base(0, "mirror", DeploymentPhase::Started)))
            .unwrap();

        let mut k8 = MockK8Client::new();
        k8.expect_list_pods().never();
        let validator = RemoteConfigValidator::new(Arc::new(k8));

        let err = validator
            .validate_components(&components, &BTreeMap::new(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, ValidatorError::ContextNotMapped(_)));
    }
}
