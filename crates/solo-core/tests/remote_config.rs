//! Remote config lifecycle against an in-memory cluster

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use solo_core::lock::LEASE_NAME;
use solo_core::remote::{REMOTE_CONFIG_DATA_KEY, REMOTE_CONFIG_LABEL_KEY, REMOTE_CONFIG_LABEL_VALUE, REMOTE_CONFIG_NAME};
use solo_core::{ConfigMap, CreateRequest, K8Client, Pod, RemoteConfigError, ValidatorError};
use solo_mapper::from_yaml_str;
use solo_model::{
    BaseComponent, ClusterRef, ComponentId, ComponentType, ConsensusNodeComponent, DeploymentPhase, LedgerPhase,
};
use solo_test_utils::fixtures::{fast_settings, local_config, manager, target, CLUSTER, CONTEXT, DEPLOYMENT, NAMESPACE};
use solo_test_utils::MemoryK8Client;

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
commandHistory:
  - solo network deploy
"#;

fn cluster() -> Arc<MemoryK8Client> {
    Arc::new(MemoryK8Client::new(&[CONTEXT]))
}

fn create_request(aliases: &[&str]) -> CreateRequest {
    CreateRequest::new(DEPLOYMENT, CLUSTER, "solo deployment create").with_node_aliases(aliases.iter().copied())
}

fn consensus_node(id: ComponentId) -> ConsensusNodeComponent {
    let base = BaseComponent::new(
        id,
        format!("node{}", id.as_u32() + 1),
        ClusterRef::new(CLUSTER),
        NAMESPACE,
        DeploymentPhase::Requested,
    );
    ConsensusNodeComponent::new(base, id.as_u32())
}

#[tokio::test]
async fn create_get_modify_get() {
    let k8 = cluster();
    let manager = manager(k8.clone(), fast_settings());
    let local = local_config();

    let created = manager
        .create(&target(), create_request(&["node1"]), &local)
        .await
        .unwrap();
    assert_eq!(created.components.len(), 1);
    assert!(manager.is_loaded());

    let loaded = manager.get(&target()).await.unwrap();
    assert_eq!(loaded, created);

    manager
        .modify(&target(), |mut data| async move {
            let id = data.components.new_component_index(ComponentType::ConsensusNode);
            data.components.add_new_component(consensus_node(id))?;
            data.add_command_to_history("solo node add", 50);
            Ok(data)
        })
        .await
        .unwrap();

    manager.unload();
    let reloaded = manager.get(&target()).await.unwrap();
    let names: Vec<_> = reloaded.components.consensus_nodes().map(|n| n.base().name()).collect();
    assert_eq!(names, vec!["node1", "node2"]);
    assert_eq!(
        reloaded.command_history(),
        &["solo deployment create".to_string(), "solo node add".to_string()]
    );
    assert_eq!(reloaded.last_executed_command(), Some("solo node add"));

    let nodes = manager.consensus_nodes(&local).unwrap();
    assert_eq!(nodes[1].context, CONTEXT);
    assert_eq!(nodes[1].account_id, "0.0.4");
    assert_eq!(manager.contexts(&local).unwrap(), vec![CONTEXT.to_string()]);
    let refs = manager.cluster_refs(&local).unwrap();
    assert_eq!(refs.get(&ClusterRef::new(CLUSTER)).map(String::as_str), Some(CONTEXT));
}

#[tokio::test]
async fn second_create_already_exists() {
    let k8 = cluster();
    let manager = manager(k8.clone(), fast_settings());
    manager
        .create(&target(), create_request(&[]), &local_config())
        .await
        .unwrap();

    let err = manager
        .create(&target(), create_request(&[]), &local_config())
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteConfigError::AlreadyExists { .. }));
}

#[tokio::test]
async fn missing_remote_config_is_not_found() {
    let manager = manager(cluster(), fast_settings());
    let err = manager.get(&target()).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn failed_callback_leaves_config_map_untouched() {
    let k8 = cluster();
    let manager = manager(k8.clone(), fast_settings());
    manager
        .create(&target(), create_request(&["node1"]), &local_config())
        .await
        .unwrap();
    let before = k8.config_map(&target(), REMOTE_CONFIG_NAME).unwrap();

    let err = manager
        .modify(&target(), |mut data| async move {
            data.components.clear();
            Err(RemoteConfigError::aborted("operator cancelled"))
        })
        .await
        .unwrap_err();

    assert!(matches!(err, RemoteConfigError::Aborted(_)));
    assert_eq!(k8.config_map(&target(), REMOTE_CONFIG_NAME).unwrap(), before);
    assert!(k8.config_map(&target(), LEASE_NAME).is_none());
}

#[tokio::test]
async fn invalid_result_is_not_written() {
    let k8 = cluster();
    let manager = manager(k8.clone(), fast_settings());
    manager
        .create(&target(), create_request(&["node1"]), &local_config())
        .await
        .unwrap();
    let before = k8.config_map(&target(), REMOTE_CONFIG_NAME).unwrap();

    let err = manager
        .modify(&target(), |mut data| async move {
            data.metadata.namespace = "Not_A_Label".to_string();
            Ok(data)
        })
        .await
        .unwrap_err();

    assert!(matches!(err, RemoteConfigError::Validation(_)));
    assert_eq!(k8.config_map(&target(), REMOTE_CONFIG_NAME).unwrap(), before);
}

#[tokio::test]
async fn unchanged_document_is_not_written() {
    let k8 = cluster();
    let manager = manager(k8.clone(), fast_settings());
    manager
        .create(&target(), create_request(&["node1"]), &local_config())
        .await
        .unwrap();
    let before = k8.config_map(&target(), REMOTE_CONFIG_NAME).unwrap();

    manager
        .modify(&target(), |data| async move { Ok(data) })
        .await
        .unwrap();
    assert_eq!(k8.config_map(&target(), REMOTE_CONFIG_NAME).unwrap(), before);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_modifications_are_serialized() {
    let k8 = cluster();
    manager(k8.clone(), fast_settings())
        .create(&target(), create_request(&[]), &local_config())
        .await
        .unwrap();

    let writers: Vec<_> = (0..6)
        .map(|_| {
            let manager = manager(k8.clone(), fast_settings());
            tokio::spawn(async move {
                manager
                    .modify(&target(), |mut data| async move {
                        let id = data.components.new_component_index(ComponentType::ConsensusNode);
                        tokio::task::yield_now().await;
                        data.components.add_new_component(consensus_node(id))?;
                        Ok(data)
                    })
                    .await
            })
        })
        .collect();
    for writer in writers {
        writer.await.unwrap().unwrap();
    }

    let fresh = manager(k8.clone(), fast_settings());
    let data = fresh.get(&target()).await.unwrap();
    let ids: Vec<u32> = data.components.consensus_nodes().map(|n| n.node_id()).collect();
    assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
    assert!(k8.config_map(&target(), LEASE_NAME).is_none());
}

#[tokio::test]
async fn legacy_document_is_migrated_and_rewritten() {
    let k8 = cluster();
    k8.put_config_map(
        CONTEXT,
        ConfigMap::new(REMOTE_CONFIG_NAME, NAMESPACE)
            .with_label(REMOTE_CONFIG_LABEL_KEY, REMOTE_CONFIG_LABEL_VALUE)
            .with_data(REMOTE_CONFIG_DATA_KEY, REMOTE_V0),
    );
    let manager = manager(k8.clone(), fast_settings());

    let data = manager.get(&target()).await.unwrap();
    assert_eq!(data.schema_version(), 2);
    assert_eq!(data.ledger_phase(), LedgerPhase::Uninitialized);

    manager
        .modify(&target(), |data| async move { Ok(data) })
        .await
        .unwrap();
    let stored = k8.config_map(&target(), REMOTE_CONFIG_NAME).unwrap();
    let plain = from_yaml_str(&stored.data[REMOTE_CONFIG_DATA_KEY]).unwrap();
    assert_eq!(plain["schemaVersion"], json!(2));
    assert_eq!(plain["metadata"]["lastUpdatedBy"]["name"], json!("john"));
}

#[tokio::test]
async fn load_and_validate_checks_pods() {
    let k8 = cluster();
    let manager = manager(k8.clone(), fast_settings());
    let local = local_config();
    manager
        .create(&target(), create_request(&["node1"]), &local)
        .await
        .unwrap();

    // requested nodes have no pods yet
    manager
        .load_and_validate(&target(), "solo network deploy", true, false, &local)
        .await
        .unwrap();

    manager
        .modify(&target(), |mut data| async move {
            data.components
                .change_node_state(ComponentId::new(0), DeploymentPhase::Deployed)?;
            Ok(data)
        })
        .await
        .unwrap();

    let err = manager
        .load_and_validate(&target(), "solo node setup", true, false, &local)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RemoteConfigError::Validator(ValidatorError::ComponentNotFound { .. })
    ));

    let skipped = manager
        .load_and_validate(&target(), "solo node setup", true, true, &local)
        .await
        .unwrap();
    assert_eq!(skipped.last_executed_command(), Some("solo node setup"));

    k8.add_pod(
        CONTEXT,
        Pod::new("network-node1-0", NAMESPACE)
            .with_label("solo.hedera.com/type", "network-node")
            .with_label("solo.hedera.com/node-name", "node1"),
    );
    manager
        .load_and_validate(&target(), "solo node setup", true, false, &local)
        .await
        .unwrap();
}

#[tokio::test]
async fn delete_components_and_delete() {
    let k8 = cluster();
    let manager = manager(k8.clone(), fast_settings());
    manager
        .create(&target(), create_request(&["node1", "node2"]), &local_config())
        .await
        .unwrap();

    let cleared = manager.delete_components(&target()).await.unwrap();
    assert!(cleared.components.is_empty());

    manager.delete(&target()).await.unwrap();
    assert!(!manager.is_loaded());
    assert!(k8.config_map(&target(), REMOTE_CONFIG_NAME).is_none());
    assert!(manager.delete(&target()).await.unwrap_err().is_not_found());
    assert!(k8.list_config_maps(&target(), "").await.unwrap().is_empty());
}
