//! Collaborators shared by every command

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use solo_core::{
    ChartManager, ConfigMapLockManager, HelmCli, K8Client, KubectlClient, LocalConfigStore, RemoteConfigManager,
    Settings, Target,
};
use solo_model::{LocalConfig, UserIdentity};

/// Wired collaborators for one invocation
#[derive(Debug)]
pub(crate) struct AppContext {
    pub(crate) settings: Settings,
    pub(crate) identity: UserIdentity,
    pub(crate) k8: Arc<dyn K8Client>,
    pub(crate) helm: Arc<dyn ChartManager>,
    pub(crate) store: LocalConfigStore,
    pub(crate) remote: RemoteConfigManager,
    pub(crate) quiet: bool,
    /// Full command line, recorded in the remote config history
    pub(crate) command: String,
}

impl AppContext {
    pub(crate) fn new(home: Option<&Path>, quiet: bool, command: String) -> Result<Self> {
        let home = Settings::resolve_home(home)?;
        let settings = Settings::load(&home).with_context(|| format!("loading settings from {}", home.display()))?;
        let identity = operator_identity();

        let k8: Arc<dyn K8Client> = Arc::new(KubectlClient::new(&settings.binaries.kubectl));
        let helm: Arc<dyn ChartManager> = Arc::new(HelmCli::new(&settings.binaries.helm));
        let locks = Arc::new(ConfigMapLockManager::new(k8.clone(), settings.lock, identity.to_string()));
        let remote = RemoteConfigManager::new(k8.clone(), locks, settings.clone(), identity.clone())?;
        let store = LocalConfigStore::new(settings.local_config_path())?;

        tracing::debug!(home = %home.display(), operator = %identity, "context ready");
        Ok(Self {
            settings,
            identity,
            k8,
            helm,
            store,
            remote,
            quiet,
            command,
        })
    }

    /// Local config; commands other than `init` and `context connect` need one
    pub(crate) async fn local(&self) -> Result<LocalConfig> {
        self.store
            .load()
            .await
            .with_context(|| "no usable local config (run `solo context connect` first)".to_string())
    }

    /// Deployment target: the deployment namespace on its first cluster
    pub(crate) fn target(&self, local: &LocalConfig, deployment: Option<&str>) -> Result<Target> {
        let deployment = match deployment {
            Some(name) => local
                .deployment(name)
                .ok_or_else(|| anyhow!("deployment '{name}' is not in the local config"))?,
            None => local
                .current_deployment()
                .ok_or_else(|| anyhow!("no current deployment (pass --deployment)"))?,
        };
        let cluster = deployment
            .clusters
            .first()
            .ok_or_else(|| anyhow!("deployment '{}' has no clusters", deployment.name))?;
        let context = local
            .context_for(cluster)
            .ok_or_else(|| anyhow!("cluster '{cluster}' has no kube context"))?;
        Ok(Target::new(context, &deployment.namespace))
    }
}

fn env_value(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|value| !value.trim().is_empty())
}

/// Operator name and host from the environment
pub(crate) fn operator_identity() -> UserIdentity {
    let defaults = UserIdentity::default();
    UserIdentity::new(
        env_value(&["USER", "USERNAME"]).unwrap_or(defaults.name),
        env_value(&["HOSTNAME", "COMPUTERNAME"]).unwrap_or(defaults.hostname),
    )
}
