//! ConfigMap lease against an in-memory cluster

use std::sync::Arc;

use chrono::{Duration, Utc};
use solo_core::lock::{LEASE_LABEL_KEY, LEASE_LABEL_VALUE, LEASE_NAME};
use solo_core::{ConfigMap, ConfigMapLockManager, LockError, LockManager, LockSettings};
use solo_test_utils::fixtures::{target, CONTEXT, NAMESPACE};
use solo_test_utils::MemoryK8Client;

fn settings(attempts: u32) -> LockSettings {
    LockSettings {
        acquire_attempts: attempts,
        acquire_delay_ms: 5,
        lease_duration_secs: 20,
        renew_interval_ms: 50,
    }
}

fn foreign_lease(renewed_ago_secs: i64) -> ConfigMap {
    ConfigMap::new(LEASE_NAME, NAMESPACE)
        .with_label(LEASE_LABEL_KEY, LEASE_LABEL_VALUE)
        .with_data("holder", "jane@laptop")
        .with_data("holderId", uuid::Uuid::new_v4().to_string())
        .with_data("renewedAt", (Utc::now() - Duration::seconds(renewed_ago_secs)).to_rfc3339())
        .with_data("durationSecs", "20")
}

#[tokio::test]
async fn acquire_renew_release() {
    let k8 = Arc::new(MemoryK8Client::new(&[CONTEXT]));
    let locks = ConfigMapLockManager::new(k8.clone(), settings(3), "john@workstation");

    let lease = locks.acquire(&target()).await.unwrap();
    let stored = k8.config_map(&target(), LEASE_NAME).unwrap();
    assert_eq!(stored.data["holder"], "john@workstation");
    assert_eq!(stored.data["holderId"], lease.holder_id.to_string());

    locks.renew(&lease).await.unwrap();
    let renewed = k8.config_map(&target(), LEASE_NAME).unwrap();
    assert_ne!(renewed.resource_version, stored.resource_version);

    locks.release(&lease).await.unwrap();
    assert!(k8.config_map(&target(), LEASE_NAME).is_none());
    locks.release(&lease).await.unwrap();
}

#[tokio::test]
async fn live_foreign_lease_blocks_until_timeout() {
    let k8 = Arc::new(MemoryK8Client::new(&[CONTEXT]));
    k8.put_config_map(CONTEXT, foreign_lease(1));
    let locks = ConfigMapLockManager::new(k8.clone(), settings(3), "john@workstation");

    match locks.acquire(&target()).await.unwrap_err() {
        LockError::AcquireTimeout { holder, attempts, .. } => {
            assert_eq!(holder, "jane@laptop");
            assert_eq!(attempts, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn expired_foreign_lease_is_taken_over() {
    let k8 = Arc::new(MemoryK8Client::new(&[CONTEXT]));
    k8.put_config_map(CONTEXT, foreign_lease(120));
    let locks = ConfigMapLockManager::new(k8.clone(), settings(1), "john@workstation");

    let lease = locks.acquire(&target()).await.unwrap();
    let stored = k8.config_map(&target(), LEASE_NAME).unwrap();
    assert_eq!(stored.data["holder"], "john@workstation");
    assert_eq!(stored.data["holderId"], lease.holder_id.to_string());
}

#[tokio::test]
async fn unreadable_lease_is_taken_over() {
    let k8 = Arc::new(MemoryK8Client::new(&[CONTEXT]));
    k8.put_config_map(
        CONTEXT,
        ConfigMap::new(LEASE_NAME, NAMESPACE).with_data("holder", "jane@laptop"),
    );
    let locks = ConfigMapLockManager::new(k8.clone(), settings(1), "john@workstation");
    assert!(locks.acquire(&target()).await.is_ok());
}

#[tokio::test]
async fn lost_lease_cannot_be_renewed() {
    let k8 = Arc::new(MemoryK8Client::new(&[CONTEXT]));
    let locks = ConfigMapLockManager::new(k8.clone(), settings(1), "john@workstation");
    let lease = locks.acquire(&target()).await.unwrap();

    // someone else forcibly takes the lease
    k8.put_config_map(CONTEXT, foreign_lease(0));
    assert!(matches!(locks.renew(&lease).await, Err(LockError::NotHolder { .. })));
    assert!(matches!(locks.release(&lease).await, Err(LockError::NotHolder { .. })));
    assert!(k8.config_map(&target(), LEASE_NAME).is_some());
}
