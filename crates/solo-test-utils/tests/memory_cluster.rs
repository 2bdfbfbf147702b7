//! In-memory cluster behaves like an API server for the calls solo makes

use solo_core::{ConfigMap, K8Client, K8Error, Pod, Target};
use solo_test_utils::fixtures::{target, CONTEXT, NAMESPACE};
use solo_test_utils::{MemoryK8Client, ScriptedPrompter};
use solo_core::Prompter;

#[tokio::test]
async fn stale_replace_conflicts() {
    let k8 = MemoryK8Client::new(&[CONTEXT]);
    let created = k8
        .create_config_map(CONTEXT, &ConfigMap::new("cm", NAMESPACE).with_data("k", "1"))
        .await
        .unwrap();

    let fresh = k8
        .replace_config_map(CONTEXT, &created.clone().with_data("k", "2"))
        .await
        .unwrap();
    assert_ne!(fresh.resource_version, created.resource_version);

    let err = k8
        .replace_config_map(CONTEXT, &created.with_data("k", "3"))
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(k8.config_map(&target(), "cm").unwrap().data["k"], "2");
    assert_eq!(k8.writes(), 2);
}

#[tokio::test]
async fn create_twice_already_exists() {
    let k8 = MemoryK8Client::new(&[CONTEXT]);
    let cm = ConfigMap::new("cm", NAMESPACE);
    k8.create_config_map(CONTEXT, &cm).await.unwrap();
    assert!(k8.create_config_map(CONTEXT, &cm).await.unwrap_err().is_already_exists());
    k8.delete_config_map(&target(), "cm", None).await.unwrap();
    assert!(k8.delete_config_map(&target(), "cm", None).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn guarded_delete_checks_version() {
    let k8 = MemoryK8Client::new(&[CONTEXT]);
    let created = k8.create_config_map(CONTEXT, &ConfigMap::new("cm", NAMESPACE)).await.unwrap();
    let replaced = k8.replace_config_map(CONTEXT, &created).await.unwrap();

    let stale = created.resource_version.as_deref();
    assert!(k8.delete_config_map(&target(), "cm", stale).await.unwrap_err().is_conflict());
    assert!(k8.config_map(&target(), "cm").is_some());

    k8.delete_config_map(&target(), "cm", replaced.resource_version.as_deref())
        .await
        .unwrap();
    assert!(k8.config_map(&target(), "cm").is_none());
}

#[tokio::test]
async fn unknown_context_is_rejected() {
    let k8 = MemoryK8Client::new(&[CONTEXT]);
    let err = k8
        .list_pods(&Target::new("kind-other", NAMESPACE), "")
        .await
        .unwrap_err();
    assert!(matches!(err, K8Error::ContextNotFound(_)));
    assert_eq!(k8.current_context().await.unwrap(), CONTEXT);
}

#[tokio::test]
async fn pods_filter_by_namespace_and_selector() {
    let k8 = MemoryK8Client::new(&[CONTEXT])
        .with_pod(CONTEXT, Pod::new("relay-0", NAMESPACE).with_label("app.kubernetes.io/name", "relay"))
        .with_pod(CONTEXT, Pod::new("relay-0", "other").with_label("app.kubernetes.io/name", "relay"));
    let pods = k8.list_pods(&target(), "app.kubernetes.io/name=relay").await.unwrap();
    assert_eq!(pods.len(), 1);
    assert!(k8.list_pods(&target(), "app.kubernetes.io/name=importer").await.unwrap().is_empty());
}

#[tokio::test]
async fn scripted_prompter_replays_and_records() {
    let prompter = ScriptedPrompter::new(&["first"]);
    assert_eq!(prompter.input("q1", None).await.unwrap(), "first");
    assert!(prompter.input("q2", None).await.is_err());
    assert_eq!(prompter.questions(), vec!["q1".to_string(), "q2".to_string()]);
    assert_eq!(prompter.remaining(), 0);
}
