//! Shared fixtures

use std::sync::Arc;

use solo_core::{ConfigMapLockManager, K8Client, LockSettings, RemoteConfigManager, Settings, Target};
use solo_model::{ClusterRef, Deployment, LocalConfig, UserIdentity};

/// Cluster ref used by fixtures
pub const CLUSTER: &str = "cluster-1";

/// Kube context used by fixtures
pub const CONTEXT: &str = "kind-solo";

/// Namespace used by fixtures
pub const NAMESPACE: &str = "solo";

/// Deployment used by fixtures
pub const DEPLOYMENT: &str = "solo-deployment";

/// Fixture deployment target
#[must_use]
pub fn target() -> Target {
    Target::new(CONTEXT, NAMESPACE)
}

/// Fixture operator
#[must_use]
pub fn identity() -> UserIdentity {
    UserIdentity::new("john", "workstation")
}

/// Local config with one deployment on [`CLUSTER`] mapped to [`CONTEXT`]
///
/// # Panics
/// Panics if the fixture itself is invalid
#[must_use]
pub fn local_config() -> LocalConfig {
    let mut config = LocalConfig::new("john@doe.com", identity()).expect("fixture email");
    config
        .set_cluster_context(ClusterRef::new(CLUSTER), CONTEXT)
        .expect("fixture context");
    config
        .add_deployment(Deployment::new(DEPLOYMENT, NAMESPACE, vec![ClusterRef::new(CLUSTER)]))
        .expect("fixture deployment");
    config.set_current_deployment(DEPLOYMENT).expect("fixture current");
    config
}

/// Settings with lease timings suited to tests
#[must_use]
pub fn fast_settings() -> Settings {
    Settings::new().with_lock(LockSettings {
        acquire_attempts: 200,
        acquire_delay_ms: 5,
        lease_duration_secs: 20,
        renew_interval_ms: 50,
    })
}

/// Remote config manager with a ConfigMap lease on the given cluster
///
/// # Panics
/// Panics if the remote config schema chain is broken
#[must_use]
pub fn manager(k8: Arc<dyn K8Client>, settings: Settings) -> RemoteConfigManager {
    let locks = Arc::new(ConfigMapLockManager::new(k8.clone(), settings.lock, identity().to_string()));
    RemoteConfigManager::new(k8, locks, settings, identity()).expect("remote config schema")
}
