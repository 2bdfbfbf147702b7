//! Deployment components
//!
//! - [`Component`] is a closed enum over the six component kinds
//! - [`ComponentsDataWrapper`] owns every component of a deployment, keyed
//!   by type then id
//!
//! Component fields are read-only; only the phase changes, and only through
//! the wrapper so that every change is checked against the lifecycle.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::phase::DeploymentPhase;
use crate::types::{ClusterRef, ComponentId};

/// Kind of deployed component
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentType {
    /// Hedera consensus node
    ConsensusNode,
    /// JSON-RPC relay
    Relay,
    /// HAProxy in front of a consensus node
    #[serde(rename = "haproxy")]
    HaProxy,
    /// Envoy gRPC-web proxy
    EnvoyProxy,
    /// Mirror node
    MirrorNode,
    /// Mirror node explorer
    Explorer,
}

impl ComponentType {
    /// All component types
    pub const ALL: [Self; 6] = [
        Self::ConsensusNode,
        Self::Relay,
        Self::HaProxy,
        Self::EnvoyProxy,
        Self::MirrorNode,
        Self::Explorer,
    ];

    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConsensusNode => "consensus-node",
            Self::Relay => "relay",
            Self::HaProxy => "haproxy",
            Self::EnvoyProxy => "envoy-proxy",
            Self::MirrorNode => "mirror-node",
            Self::Explorer => "explorer",
        }
    }

    /// Pod label selector identifying this component's pods
    #[must_use]
    pub const fn pod_label_selector(self) -> &'static str {
        match self {
            Self::ConsensusNode => "solo.hedera.com/type=network-node",
            Self::Relay => "app.kubernetes.io/name=relay",
            Self::HaProxy => "solo.hedera.com/type=haproxy",
            Self::EnvoyProxy => "solo.hedera.com/type=envoy-proxy",
            Self::MirrorNode => "app.kubernetes.io/name=importer",
            Self::Explorer => "app.kubernetes.io/component=hedera-explorer",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ModelError::UnknownComponentType(s.to_string()))
    }
}

/// Fields shared by every component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseComponent {
    id: ComponentId,
    name: String,
    cluster: ClusterRef,
    namespace: String,
    phase: DeploymentPhase,
}

impl BaseComponent {
    /// Create base fields
    #[must_use]
    pub fn new(
        id: ComponentId,
        name: impl Into<String>,
        cluster: ClusterRef,
        namespace: impl Into<String>,
        phase: DeploymentPhase,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            cluster,
            namespace: namespace.into(),
            phase,
        }
    }

    /// Component id
    #[inline]
    #[must_use]
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Component name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cluster the component runs in
    #[inline]
    #[must_use]
    pub fn cluster(&self) -> &ClusterRef {
        &self.cluster
    }

    /// Namespace the component runs in
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Lifecycle phase
    #[inline]
    #[must_use]
    pub fn phase(&self) -> DeploymentPhase {
        self.phase
    }
}

/// Consensus node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusNodeComponent {
    #[serde(flatten)]
    base: BaseComponent,
    node_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gossip_keys_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tls_keys_secret: Option<String>,
}

impl ConsensusNodeComponent {
    /// Create consensus node
    #[must_use]
    pub fn new(base: BaseComponent, node_id: u32) -> Self {
        Self {
            base,
            node_id,
            gossip_keys_secret: None,
            tls_keys_secret: None,
        }
    }

    /// Attach key secret references
    #[must_use]
    pub fn with_key_secrets(mut self, gossip: impl Into<String>, tls: impl Into<String>) -> Self {
        self.gossip_keys_secret = Some(gossip.into());
        self.tls_keys_secret = Some(tls.into());
        self
    }

    /// Shared fields
    #[inline]
    #[must_use]
    pub fn base(&self) -> &BaseComponent {
        &self.base
    }

    /// Ledger node id
    #[inline]
    #[must_use]
    pub fn node_id(&self) -> u32 {
        self.node_id
    }

    /// Gossip key secret name
    #[must_use]
    pub fn gossip_keys_secret(&self) -> Option<&str> {
        self.gossip_keys_secret.as_deref()
    }

    /// TLS key secret name
    #[must_use]
    pub fn tls_keys_secret(&self) -> Option<&str> {
        self.tls_keys_secret.as_deref()
    }
}

/// JSON-RPC relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayComponent {
    #[serde(flatten)]
    base: BaseComponent,
    #[serde(default)]
    consensus_node_ids: Vec<u32>,
}

impl RelayComponent {
    /// Create relay serving the given consensus nodes
    #[must_use]
    pub fn new(base: BaseComponent, consensus_node_ids: Vec<u32>) -> Self {
        Self {
            base,
            consensus_node_ids,
        }
    }

    /// Shared fields
    #[inline]
    #[must_use]
    pub fn base(&self) -> &BaseComponent {
        &self.base
    }

    /// Node ids of the consensus nodes behind this relay
    #[inline]
    #[must_use]
    pub fn consensus_node_ids(&self) -> &[u32] {
        &self.consensus_node_ids
    }
}

macro_rules! simple_component {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            #[serde(flatten)]
            base: BaseComponent,
        }

        impl $name {
            /// Create component
            #[inline]
            #[must_use]
            pub fn new(base: BaseComponent) -> Self {
                Self { base }
            }

            /// Shared fields
            #[inline]
            #[must_use]
            pub fn base(&self) -> &BaseComponent {
                &self.base
            }
        }
    };
}

simple_component!(
    /// HAProxy load balancer
    HaProxyComponent
);
simple_component!(
    /// Envoy proxy
    EnvoyProxyComponent
);
simple_component!(
    /// Mirror node
    MirrorNodeComponent
);
simple_component!(
    /// Mirror node explorer
    ExplorerComponent
);

/// Any component
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
    /// Consensus node
    ConsensusNode(ConsensusNodeComponent),
    /// Relay
    Relay(RelayComponent),
    /// HAProxy
    HaProxy(HaProxyComponent),
    /// Envoy proxy
    EnvoyProxy(EnvoyProxyComponent),
    /// Mirror node
    MirrorNode(MirrorNodeComponent),
    /// Explorer
    Explorer(ExplorerComponent),
}

impl Component {
    /// Component kind
    #[must_use]
    pub fn component_type(&self) -> ComponentType {
        match self {
            Self::ConsensusNode(_) => ComponentType::ConsensusNode,
            Self::Relay(_) => ComponentType::Relay,
            Self::HaProxy(_) => ComponentType::HaProxy,
            Self::EnvoyProxy(_) => ComponentType::EnvoyProxy,
            Self::MirrorNode(_) => ComponentType::MirrorNode,
            Self::Explorer(_) => ComponentType::Explorer,
        }
    }

    /// Shared fields
    #[must_use]
    pub fn base(&self) -> &BaseComponent {
        match self {
            Self::ConsensusNode(c) => &c.base,
            Self::Relay(c) => &c.base,
            Self::HaProxy(c) => &c.base,
            Self::EnvoyProxy(c) => &c.base,
            Self::MirrorNode(c) => &c.base,
            Self::Explorer(c) => &c.base,
        }
    }

    fn base_mut(&mut self) -> &mut BaseComponent {
        match self {
            Self::ConsensusNode(c) => &mut c.base,
            Self::Relay(c) => &mut c.base,
            Self::HaProxy(c) => &mut c.base,
            Self::EnvoyProxy(c) => &mut c.base,
            Self::MirrorNode(c) => &mut c.base,
            Self::Explorer(c) => &mut c.base,
        }
    }

    /// Component id
    #[inline]
    #[must_use]
    pub fn id(&self) -> ComponentId {
        self.base().id()
    }

    /// Component name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        self.base().name()
    }

    /// Cluster
    #[inline]
    #[must_use]
    pub fn cluster(&self) -> &ClusterRef {
        self.base().cluster()
    }

    /// Namespace
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.base().namespace()
    }

    /// Lifecycle phase
    #[inline]
    #[must_use]
    pub fn phase(&self) -> DeploymentPhase {
        self.base().phase()
    }

    /// Downcast to consensus node
    #[must_use]
    pub fn as_consensus_node(&self) -> Option<&ConsensusNodeComponent> {
        match self {
            Self::ConsensusNode(c) => Some(c),
            _ => None,
        }
    }

    /// Downcast to relay
    #[must_use]
    pub fn as_relay(&self) -> Option<&RelayComponent> {
        match self {
            Self::Relay(c) => Some(c),
            _ => None,
        }
    }
}

macro_rules! component_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Component {
                fn from(c: $ty) -> Self {
                    Self::$variant(c)
                }
            }
        )*
    };
}

component_from!(
    ConsensusNode(ConsensusNodeComponent),
    Relay(RelayComponent),
    HaProxy(HaProxyComponent),
    EnvoyProxy(EnvoyProxyComponent),
    MirrorNode(MirrorNodeComponent),
    Explorer(ExplorerComponent),
);

/// Persisted shape: one array per component type
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComponentsDocument {
    #[serde(default)]
    consensus_nodes: Vec<ConsensusNodeComponent>,
    #[serde(default)]
    relays: Vec<RelayComponent>,
    #[serde(default)]
    ha_proxies: Vec<HaProxyComponent>,
    #[serde(default)]
    envoy_proxies: Vec<EnvoyProxyComponent>,
    #[serde(default)]
    mirror_nodes: Vec<MirrorNodeComponent>,
    #[serde(default)]
    explorers: Vec<ExplorerComponent>,
}

/// All components of one deployment
///
/// Ids are unique per component type. Iteration is ordered by type then id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ComponentsDocument", into = "ComponentsDocument")]
pub struct ComponentsDataWrapper {
    components: BTreeMap<ComponentType, BTreeMap<ComponentId, Component>>,
}

impl ComponentsDataWrapper {
    /// Create empty wrapper
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component
    ///
    /// # Errors
    /// Returns `DuplicateComponent` if the type already has this id
    pub fn add_new_component(&mut self, component: impl Into<Component>) -> Result<(), ModelError> {
        let component = component.into();
        let component_type = component.component_type();
        let id = component.id();
        let slot = self.components.entry(component_type).or_default();
        if slot.contains_key(&id) {
            return Err(ModelError::DuplicateComponent { component_type, id });
        }
        slot.insert(id, component);
        Ok(())
    }

    /// Look up a component
    ///
    /// # Errors
    /// Returns `ComponentNotFound` if absent
    pub fn get_component(
        &self,
        component_type: ComponentType,
        id: ComponentId,
    ) -> Result<&Component, ModelError> {
        self.components
            .get(&component_type)
            .and_then(|by_id| by_id.get(&id))
            .ok_or(ModelError::ComponentNotFound { component_type, id })
    }

    /// Components of one type in one cluster
    #[must_use]
    pub fn get_components_by_cluster(
        &self,
        component_type: ComponentType,
        cluster: &ClusterRef,
    ) -> Vec<&Component> {
        self.components_of(component_type)
            .filter(|c| c.cluster() == cluster)
            .collect()
    }

    /// Components of one type, by id
    pub fn components_of(&self, component_type: ComponentType) -> impl Iterator<Item = &Component> {
        self.components
            .get(&component_type)
            .into_iter()
            .flat_map(BTreeMap::values)
    }

    /// Consensus nodes, by id
    pub fn consensus_nodes(&self) -> impl Iterator<Item = &ConsensusNodeComponent> {
        self.components_of(ComponentType::ConsensusNode)
            .filter_map(Component::as_consensus_node)
    }

    /// Consensus node by name (node alias)
    #[must_use]
    pub fn consensus_node_by_name(&self, name: &str) -> Option<&ConsensusNodeComponent> {
        self.consensus_nodes().find(|n| n.base().name() == name)
    }

    /// Move a consensus node to a new phase
    ///
    /// # Errors
    /// Returns `ComponentNotFound` for an unknown id or
    /// `IllegalPhaseTransition` if the lifecycle forbids the step
    pub fn change_node_state(
        &mut self,
        id: ComponentId,
        phase: DeploymentPhase,
    ) -> Result<DeploymentPhase, ModelError> {
        self.change_component_phase(ComponentType::ConsensusNode, id, phase)
    }

    /// Move any component to a new phase, returning the previous phase
    ///
    /// # Errors
    /// Returns `ComponentNotFound` for an unknown id or
    /// `IllegalPhaseTransition` if the lifecycle forbids the step
    pub fn change_component_phase(
        &mut self,
        component_type: ComponentType,
        id: ComponentId,
        phase: DeploymentPhase,
    ) -> Result<DeploymentPhase, ModelError> {
        let component = self
            .components
            .get_mut(&component_type)
            .and_then(|by_id| by_id.get_mut(&id))
            .ok_or(ModelError::ComponentNotFound { component_type, id })?;

        let from = component.phase();
        from.validate_transition(phase, component_type, id)?;
        component.base_mut().phase = phase;
        Ok(from)
    }

    /// Next free id for a type: max id + 1, or 0 when the type is empty
    ///
    /// When the max id is `u32::MAX` the lowest unused id is returned instead.
    #[must_use]
    pub fn new_component_index(&self, component_type: ComponentType) -> ComponentId {
        let Some(by_id) = self.components.get(&component_type) else {
            return ComponentId::new(0);
        };
        if let Some(next) = by_id.keys().next_back().and_then(|max| max.checked_next()) {
            return next;
        }
        // ids are sorted, so the first id that differs from its position marks a gap
        let free = by_id
            .keys()
            .zip(0..=u32::MAX)
            .find(|(id, expected)| id.as_u32() != *expected)
            .map_or(0, |(_, expected)| expected);
        ComponentId::new(free)
    }

    /// Remove a component
    ///
    /// # Errors
    /// Returns `ComponentNotFound` if absent
    pub fn remove_component(
        &mut self,
        component_type: ComponentType,
        id: ComponentId,
    ) -> Result<Component, ModelError> {
        let by_id = self
            .components
            .get_mut(&component_type)
            .ok_or(ModelError::ComponentNotFound { component_type, id })?;
        let removed = by_id
            .remove(&id)
            .ok_or(ModelError::ComponentNotFound { component_type, id })?;
        if by_id.is_empty() {
            self.components.remove(&component_type);
        }
        Ok(removed)
    }

    /// Remove every component
    pub fn clear(&mut self) {
        self.components.clear();
    }

    /// All components, ordered by type then id
    pub fn iter(&self) -> impl Iterator<Item = &Component> {
        self.components.values().flat_map(BTreeMap::values)
    }

    /// Number of components
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.values().map(BTreeMap::len).sum()
    }

    /// Check if there are no components
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl TryFrom<ComponentsDocument> for ComponentsDataWrapper {
    type Error = ModelError;

    fn try_from(doc: ComponentsDocument) -> Result<Self, Self::Error> {
        let mut wrapper = Self::new();
        let all = doc
            .consensus_nodes
            .into_iter()
            .map(Component::from)
            .chain(doc.relays.into_iter().map(Component::from))
            .chain(doc.ha_proxies.into_iter().map(Component::from))
            .chain(doc.envoy_proxies.into_iter().map(Component::from))
            .chain(doc.mirror_nodes.into_iter().map(Component::from))
            .chain(doc.explorers.into_iter().map(Component::from));
        for component in all {
            wrapper.add_new_component(component)?;
        }
        Ok(wrapper)
    }
}

impl From<ComponentsDataWrapper> for ComponentsDocument {
    fn from(wrapper: ComponentsDataWrapper) -> Self {
        let mut doc = Self::default();
        for component in wrapper.components.into_values().flat_map(BTreeMap::into_values) {
            match component {
                Component::ConsensusNode(c) => doc.consensus_nodes.push(c),
                Component::Relay(c) => doc.relays.push(c),
                Component::HaProxy(c) => doc.ha_proxies.push(c),
                Component::EnvoyProxy(c) => doc.envoy_proxies.push(c),
                Component::MirrorNode(c) => doc.mirror_nodes.push(c),
                Component::Explorer(c) => doc.explorers.push(c),
            }
        }
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    fn base(id: u32, name: &str, phase: DeploymentPhase) -> BaseComponent {
        BaseComponent::new(
            ComponentId::new(id),
            name,
            ClusterRef::new("cluster-1"),
            "solo",
            phase,
        )
    }

    fn node(id: u32, phase: DeploymentPhase) -> ConsensusNodeComponent {
        ConsensusNodeComponent::new(base(id, &format!("node{}", id + 1), phase), id)
    }

    fn sample() -> ComponentsDataWrapper {
        let mut components = ComponentsDataWrapper::new();
        components
            .add_new_component(node(0, DeploymentPhase::Started))
            .unwrap();
        components
            .add_new_component(
                node(1, DeploymentPhase::Requested).with_key_secrets("gossip-node2", "tls-node2"),
            )
            .unwrap();
        components
            .add_new_component(RelayComponent::new(
                base(0, "relay-1", DeploymentPhase::Deployed),
                vec![0, 1],
            ))
            .unwrap();
        components
            .add_new_component(MirrorNodeComponent::new(base(
                0,
                "mirror-1",
                DeploymentPhase::Deployed,
            )))
            .unwrap();
        components
    }

    #[test]
    fn duplicate_ids_rejected_per_type() {
        let mut components = sample();
        let err = components
            .add_new_component(node(0, DeploymentPhase::Requested))
            .unwrap_err();
        assert!(matches!(err, ModelError::DuplicateComponent { .. }));

        // same id under another type is fine
        components
            .add_new_component(ExplorerComponent::new(base(0, "explorer", DeploymentPhase::Requested)))
            .unwrap();
    }

    #[test]
    fn lookups() {
        let components = sample();
        let relay = components
            .get_component(ComponentType::Relay, ComponentId::new(0))
            .unwrap();
        assert_eq!(relay.as_relay().unwrap().consensus_node_ids(), &[0, 1]);
        assert!(components
            .get_component(ComponentType::Relay, ComponentId::new(9))
            .unwrap_err()
            .is_not_found());

        let in_cluster =
            components.get_components_by_cluster(ComponentType::ConsensusNode, &"cluster-1".into());
        assert_eq!(in_cluster.len(), 2);
        assert!(components
            .get_components_by_cluster(ComponentType::ConsensusNode, &"other".into())
            .is_empty());
        assert_eq!(components.consensus_node_by_name("node2").unwrap().node_id(), 1);
        assert_eq!(components.len(), 4);
    }

    #[test]
    fn node_state_follows_lifecycle() {
        let mut components = sample();
        let previous = components
            .change_node_state(ComponentId::new(1), DeploymentPhase::Deployed)
            .unwrap();
        assert_eq!(previous, DeploymentPhase::Requested);

        let err = components
            .change_node_state(ComponentId::new(1), DeploymentPhase::Requested)
            .unwrap_err();
        assert!(matches!(err, ModelError::IllegalPhaseTransition { .. }));

        let err = components
            .change_node_state(ComponentId::new(7), DeploymentPhase::Deployed)
            .unwrap_err();
        assert!(matches!(err, ModelError::ComponentNotFound { .. }));
    }

    #[test]
    fn new_component_index_is_max_plus_one() {
        let mut components = sample();
        assert_eq!(
            components.new_component_index(ComponentType::ConsensusNode),
            ComponentId::new(2)
        );
        assert_eq!(
            components.new_component_index(ComponentType::HaProxy),
            ComponentId::new(0)
        );
        components
            .remove_component(ComponentType::ConsensusNode, ComponentId::new(0))
            .unwrap();
        assert_eq!(
            components.new_component_index(ComponentType::ConsensusNode),
            ComponentId::new(2)
        );
    }

    #[test]
    fn new_component_index_reuses_gap_after_max_id() {
        let mut components = ComponentsDataWrapper::new();
        for id in [0, 1, u32::MAX] {
            components
                .add_new_component(MirrorNodeComponent::new(base(id, "m", DeploymentPhase::Deployed)))
                .unwrap();
        }
        let next = components.new_component_index(ComponentType::MirrorNode);
        assert_eq!(next, ComponentId::new(2));
        assert!(components.get_component(ComponentType::MirrorNode, next).is_err());
    }

    #[test]
    fn remove_and_clear() {
        let mut components = sample();
        components
            .remove_component(ComponentType::MirrorNode, ComponentId::new(0))
            .unwrap();
        assert!(components
            .remove_component(ComponentType::MirrorNode, ComponentId::new(0))
            .is_err());
        assert_eq!(components.components_of(ComponentType::MirrorNode).count(), 0);
        components.clear();
        assert!(components.is_empty());
        assert_eq!(components, ComponentsDataWrapper::new());
    }

    #[test]
    fn serde_round_trip_keeps_phases() {
        let components = sample();
        let value = serde_json::to_value(&components).unwrap();
        assert_eq!(value["consensusNodes"][1]["phase"], json!("requested"));
        assert_eq!(value["consensusNodes"][1]["gossipKeysSecret"], json!("gossip-node2"));
        assert_eq!(value["relays"][0]["consensusNodeIds"], json!([0, 1]));
        assert_eq!(value["haProxies"], json!([]));

        let back: ComponentsDataWrapper = serde_json::from_value(value).unwrap();
        assert_eq!(back, components);
    }

    #[test]
    fn duplicate_ids_fail_to_load() {
        let doc = json!({
            "consensusNodes": [
                {"id": 0, "name": "node1", "cluster": "c", "namespace": "ns", "phase": "started", "nodeId": 0},
                {"id": 0, "name": "node2", "cluster": "c", "namespace": "ns", "phase": "started", "nodeId": 1}
            ]
        });
        assert!(serde_json::from_value::<ComponentsDataWrapper>(doc).is_err());
    }

    #[test]
    fn component_type_names() {
        for ty in ComponentType::ALL {
            assert_eq!(ty.as_str().parse::<ComponentType>().unwrap(), ty);
            assert_eq!(serde_json::to_value(ty).unwrap(), json!(ty.as_str()));
        }
    }

    proptest! {
        #[test]
        fn new_index_never_collides(ids in proptest::collection::btree_set(0u32..200, 0..20)) {
            let mut components = ComponentsDataWrapper::new();
            for id in &ids {
                components
                    .add_new_component(MirrorNodeComponent::new(base(*id, "m", DeploymentPhase::Deployed)))
                    .unwrap();
            }
            let next = components.new_component_index(ComponentType::MirrorNode);
            prop_assert!(components.get_component(ComponentType::MirrorNode, next).is_err());
            prop_assert!(components
                .add_new_component(MirrorNodeComponent::new(base(next.as_u32(), "m", DeploymentPhase::Deployed)))
                .is_ok());
        }
    }
}
