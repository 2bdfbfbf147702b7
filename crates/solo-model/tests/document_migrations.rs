//! Legacy documents lifted to the current model

use pretty_assertions::assert_eq;
use serde_json::json;
use solo_mapper::from_yaml_str;
use solo_model::schemas::{local_config_schema, remote_config_schema};
use solo_model::{
    ClusterRef, ComponentId, ComponentType, DeploymentPhase, LedgerPhase, LocalConfig, RemoteConfigData,
};
use solo_schema::SchemaVersion;

const LOCAL_V1: &str = r"
schemaVersion: 1
userEmailAddress: john@doe.com
userIdentity:
  name: john
  hostname: workstation
versions:
  cli: 0.33.0
deployments:
  beta:
    namespace: solo-beta
    clusters: [cluster-2]
  alpha:
    namespace: solo-alpha
    clusters: [cluster-1, cluster-2]
currentDeploymentName: alpha
clusterRefs:
  cluster-1: kind-one
  cluster-2: kind-two
";

const LOCAL_V0: &str = r"
userEmailAddress: jane@doe.com
soloVersion: 0.30.0
deployments:
  deployment:
    namespace: solo
    clusters: [cluster-1]
clusterRefs:
  cluster-1: kind-solo
";

const REMOTE_V0: &str = r#"
metadata:
  namespace: solo
  lastUpdatedAt: "2024-03-01T10:00:00Z"
  lastUpdateBy: john
clusters:
  cluster-1: solo
components:
  consensusNodes:
    node1: {name: node1, cluster: cluster-1, namespace: solo, state: started, nodeId: 0}
    node2: {name: node2, cluster: cluster-1, namespace: solo, state: requested, nodeId: 1}
  relays:
    relay: {name: relay, cluster: cluster-1, namespace: solo, state: deployed, consensusNodeAliases: [node1, node2]}
  mirrorNodes:
    mirror-node: {name: mirror-node, cluster: cluster-1, namespace: solo, state: deployed}
  mirrorNodeExplorers:
    explorer: {name: explorer, cluster: cluster-1, namespace: solo}
commandHistory:
  - solo network deploy
lastExecutedCommand: solo network deploy
"#;

#[test]
fn local_v1_deployments_become_array() {
    let schema = local_config_schema().unwrap();
    let plain = from_yaml_str(LOCAL_V1).unwrap();
    let (config, report) = schema.transform_with_report(&plain).unwrap();

    assert_eq!(report.from, SchemaVersion::new(1));
    assert_eq!(report.applied, vec!["LocalConfigV2Migration"]);
    assert_eq!(config.schema_version(), 2);

    let names: Vec<_> = config.deployments().iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "beta"]);
    for deployment in config.deployments() {
        assert_eq!(deployment.realm, 0);
        assert_eq!(deployment.shard, 0);
    }
    assert_eq!(
        config.deployment("alpha").unwrap().clusters,
        vec![ClusterRef::new("cluster-1"), ClusterRef::new("cluster-2")]
    );
    assert_eq!(config.current_deployment().unwrap().namespace, "solo-alpha");
    config.validate().unwrap();
}

#[test]
fn local_v0_walks_whole_chain() {
    let schema = local_config_schema().unwrap();
    let config: LocalConfig = schema.transform(&from_yaml_str(LOCAL_V0).unwrap()).unwrap();

    assert_eq!(config.user_identity().name, "jane");
    assert_eq!(config.versions().cli, "0.30.0");
    assert_eq!(config.deployments().len(), 1);
    assert_eq!(config.context_for(&"cluster-1".into()), Some("kind-solo"));
    config.validate().unwrap();
}

#[test]
fn local_migration_is_idempotent() {
    let schema = local_config_schema().unwrap();
    let once: LocalConfig = schema.transform(&from_yaml_str(LOCAL_V1).unwrap()).unwrap();
    let encoded = schema.encode(&once).unwrap();

    let migrated = schema.migrate_value(&encoded).unwrap();
    assert!(!migrated.is_migrated());
    let twice: LocalConfig = schema.transform(&encoded).unwrap();
    assert_eq!(twice, once);
}

#[test]
fn remote_v0_walks_whole_chain() {
    let schema = remote_config_schema().unwrap();
    let (remote, report): (RemoteConfigData, _) = schema
        .transform_with_report(&from_yaml_str(REMOTE_V0).unwrap())
        .unwrap();

    assert_eq!(report.applied, vec!["RemoteConfigV1Migration", "RemoteConfigV2Migration"]);
    assert_eq!(remote.metadata.deployment_name, "solo");
    assert_eq!(remote.metadata.last_updated_by.name, "john");
    assert_eq!(remote.clusters.len(), 1);
    assert_eq!(remote.clusters[0].dns_base_domain, "cluster.local");
    assert_eq!(remote.ledger_phase(), LedgerPhase::Uninitialized);
    assert_eq!(remote.command_history(), &["solo network deploy".to_string()]);

    let node2 = remote
        .components
        .get_component(ComponentType::ConsensusNode, ComponentId::new(1))
        .unwrap();
    assert_eq!(node2.name(), "node2");
    assert_eq!(node2.phase(), DeploymentPhase::Requested);

    let relay = remote
        .components
        .get_component(ComponentType::Relay, ComponentId::new(0))
        .unwrap();
    assert_eq!(relay.as_relay().unwrap().consensus_node_ids(), &[0, 1]);

    let explorer = remote
        .components
        .get_component(ComponentType::Explorer, ComponentId::new(0))
        .unwrap();
    assert_eq!(explorer.phase(), DeploymentPhase::Deployed);
    remote.validate().unwrap();
}

#[test]
fn remote_round_trip_through_schema() {
    let schema = remote_config_schema().unwrap();
    let remote: RemoteConfigData = schema.transform(&from_yaml_str(REMOTE_V0).unwrap()).unwrap();
    let encoded = schema.encode(&remote).unwrap();
    assert_eq!(encoded["schemaVersion"], json!(2));

    let back: RemoteConfigData = schema.transform(&encoded).unwrap();
    assert_eq!(back, remote);
}

#[test]
fn newer_remote_document_is_rejected() {
    let schema = remote_config_schema().unwrap();
    let err = schema
        .transform(&json!({"schemaVersion": 99}))
        .unwrap_err();
    assert!(matches!(err, solo_schema::SchemaError::ForwardIncompatible { .. }));
}
