//! In-memory cluster

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use parking_lot::Mutex;
use solo_core::{ConfigMap, K8Client, K8Error, Pod, Target};

type Key = (String, String, String);

#[derive(Debug, Default)]
struct State {
    contexts: Vec<String>,
    current: Option<String>,
    namespaces: BTreeSet<(String, String)>,
    config_maps: BTreeMap<Key, ConfigMap>,
    pods: Vec<(String, Pod)>,
    next_version: u64,
    writes: u64,
}

impl State {
    fn known(&self, context: &str) -> Result<(), K8Error> {
        if self.contexts.iter().any(|c| c == context) {
            Ok(())
        } else {
            Err(K8Error::ContextNotFound(context.to_string()))
        }
    }

    fn bump(&mut self) -> String {
        self.next_version += 1;
        self.writes += 1;
        self.next_version.to_string()
    }
}

fn key(context: &str, namespace: &str, name: &str) -> Key {
    (context.to_string(), namespace.to_string(), name.to_string())
}

/// [`K8Client`] over in-memory state
///
/// Honors resource versions on replace, so optimistic concurrency and
/// already-exists races behave like a real API server.
#[derive(Debug, Default)]
pub struct MemoryK8Client {
    state: Mutex<State>,
}

impl MemoryK8Client {
    /// Create cluster with the given contexts; the first is current
    #[must_use]
    pub fn new(contexts: &[&str]) -> Self {
        let state = State {
            contexts: contexts.iter().map(|c| (*c).to_string()).collect(),
            current: contexts.first().map(|c| (*c).to_string()),
            ..State::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    /// Add a pod in a context
    pub fn add_pod(&self, context: &str, pod: Pod) {
        self.state.lock().pods.push((context.to_string(), pod));
    }

    /// With pod
    #[must_use]
    pub fn with_pod(self, context: &str, pod: Pod) -> Self {
        self.add_pod(context, pod);
        self
    }

    /// Stored ConfigMap
    #[must_use]
    pub fn config_map(&self, target: &Target, name: &str) -> Option<ConfigMap> {
        self.state
            .lock()
            .config_maps
            .get(&key(&target.context, &target.namespace, name))
            .cloned()
    }

    /// Store a ConfigMap directly, bypassing version checks
    pub fn put_config_map(&self, context: &str, mut config_map: ConfigMap) {
        let mut state = self.state.lock();
        config_map.resource_version = Some(state.bump());
        state
            .config_maps
            .insert(key(context, &config_map.namespace, &config_map.name), config_map);
    }

    /// ConfigMap creates and replaces so far
    #[must_use]
    pub fn writes(&self) -> u64 {
        self.state.lock().writes
    }
}

#[async_trait]
impl K8Client for MemoryK8Client {
    async fn list_config_maps(&self, target: &Target, selector: &str) -> Result<Vec<ConfigMap>, K8Error> {
        let state = self.state.lock();
        state.known(&target.context)?;
        Ok(state
            .config_maps
            .iter()
            .filter(|((context, namespace, _), cm)| {
                *context == target.context && *namespace == target.namespace && cm.matches(selector)
            })
            .map(|(_, cm)| cm.clone())
            .collect())
    }

    async fn read_config_map(&self, target: &Target, name: &str) -> Result<ConfigMap, K8Error> {
        let state = self.state.lock();
        state.known(&target.context)?;
        state
            .config_maps
            .get(&key(&target.context, &target.namespace, name))
            .cloned()
            .ok_or_else(|| K8Error::not_found("ConfigMap", &target.namespace, name))
    }

    async fn create_config_map(&self, context: &str, config_map: &ConfigMap) -> Result<ConfigMap, K8Error> {
        let mut state = self.state.lock();
        state.known(context)?;
        let key = key(context, &config_map.namespace, &config_map.name);
        if state.config_maps.contains_key(&key) {
            return Err(K8Error::already_exists(
                "ConfigMap",
                &config_map.namespace,
                &config_map.name,
            ));
        }
        let mut stored = config_map.clone();
        stored.resource_version = Some(state.bump());
        state.config_maps.insert(key, stored.clone());
        Ok(stored)
    }

    async fn replace_config_map(&self, context: &str, config_map: &ConfigMap) -> Result<ConfigMap, K8Error> {
        let mut state = self.state.lock();
        state.known(context)?;
        let key = key(context, &config_map.namespace, &config_map.name);
        let current = state
            .config_maps
            .get(&key)
            .ok_or_else(|| K8Error::not_found("ConfigMap", &config_map.namespace, &config_map.name))?;
        if config_map.resource_version.is_some() && config_map.resource_version != current.resource_version {
            return Err(K8Error::conflict("ConfigMap", &config_map.namespace, &config_map.name));
        }
        let mut stored = config_map.clone();
        stored.resource_version = Some(state.bump());
        state.config_maps.insert(key, stored.clone());
        Ok(stored)
    }

    async fn delete_config_map<'a>(
        &self,
        target: &Target,
        name: &str,
        resource_version: Option<&'a str>,
    ) -> Result<(), K8Error> {
        let mut state = self.state.lock();
        state.known(&target.context)?;
        let key = key(&target.context, &target.namespace, name);
        let current = state
            .config_maps
            .get(&key)
            .ok_or_else(|| K8Error::not_found("ConfigMap", &target.namespace, name))?;
        if resource_version.is_some() && resource_version != current.resource_version.as_deref() {
            return Err(K8Error::conflict("ConfigMap", &target.namespace, name));
        }
        state.config_maps.remove(&key);
        Ok(())
    }

    async fn list_pods(&self, target: &Target, selector: &str) -> Result<Vec<Pod>, K8Error> {
        let state = self.state.lock();
        state.known(&target.context)?;
        Ok(state
            .pods
            .iter()
            .filter(|(context, pod)| {
                *context == target.context && pod.namespace == target.namespace && pod.matches(selector)
            })
            .map(|(_, pod)| pod.clone())
            .collect())
    }

    async fn list_contexts(&self) -> Result<Vec<String>, K8Error> {
        Ok(self.state.lock().contexts.clone())
    }

    async fn current_context(&self) -> Result<String, K8Error> {
        self.state
            .lock()
            .current
            .clone()
            .ok_or_else(|| K8Error::ContextNotFound("<current>".to_string()))
    }

    async fn namespace_exists(&self, target: &Target) -> Result<bool, K8Error> {
        let state = self.state.lock();
        state.known(&target.context)?;
        Ok(state
            .namespaces
            .contains(&(target.context.clone(), target.namespace.clone())))
    }

    async fn create_namespace(&self, target: &Target) -> Result<(), K8Error> {
        let mut state = self.state.lock();
        state.known(&target.context)?;
        if state
            .namespaces
            .insert((target.context.clone(), target.namespace.clone()))
        {
            Ok(())
        } else {
            Err(K8Error::already_exists("Namespace", "", &target.namespace))
        }
    }
}
