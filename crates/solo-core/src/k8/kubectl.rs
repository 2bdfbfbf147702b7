//! `kubectl` process bridge

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{ConfigMap, K8Client, Pod, Target};
use crate::error::K8Error;
use crate::exec::{command_line, run};

const CONFIG_MAP: &str = "ConfigMap";

/// [`K8Client`] backed by the `kubectl` binary
#[derive(Debug, Clone)]
pub struct KubectlClient {
    binary: PathBuf,
}

impl KubectlClient {
    /// Create client using the given binary
    #[inline]
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn kubectl(&self, args: Vec<String>, stdin: Option<&str>) -> Result<String, K8Error> {
        let output = run(&self.binary, &args, stdin).await.map_err(|source| K8Error::Spawn {
            binary: self.binary.display().to_string(),
            source,
        })?;
        if output.success {
            Ok(output.stdout)
        } else {
            Err(K8Error::Command {
                command: command_line(&self.binary, &args),
                stderr: output.stderr,
            })
        }
    }

    /// Run and map well-known server errors for one named object
    async fn kubectl_object(
        &self,
        args: Vec<String>,
        stdin: Option<&str>,
        namespace: &str,
        name: &str,
    ) -> Result<String, K8Error> {
        self.kubectl(args, stdin)
            .await
            .map_err(|e| classify(e, CONFIG_MAP, namespace, name))
    }
}

fn scoped(target: &Target, rest: &[&str]) -> Vec<String> {
    let mut args = vec![
        "--context".to_string(),
        target.context.clone(),
        "-n".to_string(),
        target.namespace.clone(),
    ];
    args.extend(rest.iter().map(|s| (*s).to_string()));
    args
}

/// Map `kubectl` stderr to typed errors
fn classify(error: K8Error, kind: &'static str, namespace: &str, name: &str) -> K8Error {
    let K8Error::Command { stderr, .. } = &error else {
        return error;
    };
    if stderr.contains("(NotFound)") || stderr.contains("not found") {
        K8Error::not_found(kind, namespace, name)
    } else if stderr.contains("(AlreadyExists)") || stderr.contains("already exists") {
        K8Error::already_exists(kind, namespace, name)
    } else if stderr.contains("(Conflict)")
        || stderr.contains("the object has been modified")
        || stderr.contains("Precondition failed")
    {
        K8Error::conflict(kind, namespace, name)
    } else {
        error
    }
}

fn parse_json(text: &str, what: &'static str) -> Result<Value, K8Error> {
    serde_json::from_str(text).map_err(|e| K8Error::Parse {
        what,
        reason: e.to_string(),
    })
}

fn string_map(value: &Value) -> std::collections::BTreeMap<String, String> {
    value
        .as_object()
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

fn config_map_from_manifest(manifest: &Value) -> Result<ConfigMap, K8Error> {
    let metadata = &manifest["metadata"];
    let name = metadata["name"].as_str().ok_or_else(|| K8Error::Parse {
        what: "ConfigMap",
        reason: "missing metadata.name".to_string(),
    })?;
    Ok(ConfigMap {
        name: name.to_string(),
        namespace: metadata["namespace"].as_str().unwrap_or_default().to_string(),
        labels: string_map(&metadata["labels"]),
        data: string_map(&manifest["data"]),
        resource_version: metadata["resourceVersion"].as_str().map(str::to_string),
    })
}

fn config_map_manifest(config_map: &ConfigMap) -> Value {
    let mut metadata = json!({
        "name": config_map.name,
        "namespace": config_map.namespace,
        "labels": config_map.labels,
    });
    if let Some(version) = &config_map.resource_version {
        metadata["resourceVersion"] = json!(version);
    }
    json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": metadata,
        "data": config_map.data,
    })
}

fn delete_options(resource_version: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "DeleteOptions",
        "preconditions": {"resourceVersion": resource_version},
    })
}

fn pod_from_manifest(manifest: &Value) -> Pod {
    let metadata = &manifest["metadata"];
    Pod {
        name: metadata["name"].as_str().unwrap_or_default().to_string(),
        namespace: metadata["namespace"].as_str().unwrap_or_default().to_string(),
        labels: string_map(&metadata["labels"]),
        phase: manifest["status"]["phase"].as_str().map(str::to_string),
    }
}

fn items(list: &Value) -> &[Value] {
    list["items"].as_array().map(Vec::as_slice).unwrap_or_default()
}

#[async_trait]
impl K8Client for KubectlClient {
    async fn list_config_maps(&self, target: &Target, selector: &str) -> Result<Vec<ConfigMap>, K8Error> {
        let out = self
            .kubectl(scoped(target, &["get", "configmaps", "-l", selector, "-o", "json"]), None)
            .await?;
        items(&parse_json(&out, "ConfigMap list")?)
            .iter()
            .map(config_map_from_manifest)
            .collect()
    }

    async fn read_config_map(&self, target: &Target, name: &str) -> Result<ConfigMap, K8Error> {
        let out = self
            .kubectl_object(
                scoped(target, &["get", "configmap", name, "-o", "json"]),
                None,
                &target.namespace,
                name,
            )
            .await?;
        config_map_from_manifest(&parse_json(&out, "ConfigMap")?)
    }

    async fn create_config_map(&self, context: &str, config_map: &ConfigMap) -> Result<ConfigMap, K8Error> {
        let target = Target::new(context, &config_map.namespace);
        let manifest = config_map_manifest(&ConfigMap {
            resource_version: None,
            ..config_map.clone()
        })
        .to_string();
        let out = self
            .kubectl_object(
                scoped(&target, &["create", "-f", "-", "-o", "json"]),
                Some(&manifest),
                &config_map.namespace,
                &config_map.name,
            )
            .await?;
        config_map_from_manifest(&parse_json(&out, "ConfigMap")?)
    }

    async fn replace_config_map(&self, context: &str, config_map: &ConfigMap) -> Result<ConfigMap, K8Error> {
        let target = Target::new(context, &config_map.namespace);
        let manifest = config_map_manifest(config_map).to_string();
        let out = self
            .kubectl_object(
                scoped(&target, &["replace", "-f", "-", "-o", "json"]),
                Some(&manifest),
                &config_map.namespace,
                &config_map.name,
            )
            .await?;
        config_map_from_manifest(&parse_json(&out, "ConfigMap")?)
    }

    async fn delete_config_map<'a>(
        &self,
        target: &Target,
        name: &str,
        resource_version: Option<&'a str>,
    ) -> Result<(), K8Error> {
        let Some(version) = resource_version else {
            return self
                .kubectl_object(
                    scoped(target, &["delete", "configmap", name]),
                    None,
                    &target.namespace,
                    name,
                )
                .await
                .map(drop);
        };
        let path = format!("/api/v1/namespaces/{}/configmaps/{name}", target.namespace);
        let body = delete_options(version).to_string();
        let args = vec![
            "--context".to_string(),
            target.context.clone(),
            "delete".to_string(),
            "--raw".to_string(),
            path,
            "-f".to_string(),
            "-".to_string(),
        ];
        self.kubectl_object(args, Some(&body), &target.namespace, name)
            .await
            .map(drop)
    }

    async fn list_pods(&self, target: &Target, selector: &str) -> Result<Vec<Pod>, K8Error> {
        let out = self
            .kubectl(scoped(target, &["get", "pods", "-l", selector, "-o", "json"]), None)
            .await?;
        Ok(items(&parse_json(&out, "Pod list")?).iter().map(pod_from_manifest).collect())
    }

    async fn list_contexts(&self) -> Result<Vec<String>, K8Error> {
        let out = self
            .kubectl(
                vec!["config".into(), "get-contexts".into(), "-o".into(), "name".into()],
                None,
            )
            .await?;
        Ok(out.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect())
    }

    async fn current_context(&self) -> Result<String, K8Error> {
        let out = self
            .kubectl(vec!["config".into(), "current-context".into()], None)
            .await?;
        Ok(out.trim().to_string())
    }

    async fn namespace_exists(&self, target: &Target) -> Result<bool, K8Error> {
        let args = vec![
            "--context".to_string(),
            target.context.clone(),
            "get".to_string(),
            "namespace".to_string(),
            target.namespace.clone(),
            "-o".to_string(),
            "name".to_string(),
        ];
        match self.kubectl(args, None).await {
            Ok(_) => Ok(true),
            Err(e) => match classify(e, "Namespace", "", &target.namespace) {
                e if e.is_not_found() => Ok(false),
                e => Err(e),
            },
        }
    }

    async fn create_namespace(&self, target: &Target) -> Result<(), K8Error> {
        let args = vec![
            "--context".to_string(),
            target.context.clone(),
            "create".to_string(),
            "namespace".to_string(),
            target.namespace.clone(),
        ];
        self.kubectl(args, None)
            .await
            .map_err(|e| classify(e, "Namespace", "", &target.namespace))
            .map(drop)
    }
}
