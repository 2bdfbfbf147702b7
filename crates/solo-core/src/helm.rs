//! Helm chart operations
//!
//! [`ChartManager`] covers the chart lifecycle solo needs; [`HelmCli`]
//! drives the `helm` binary.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::HelmError;
use crate::exec::{command_line, run};

/// Options shared by chart commands
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartOptions {
    /// Release namespace
    pub namespace: String,
    /// Kube context
    pub context: Option<String>,
    /// Chart version
    pub version: Option<String>,
    /// Keep values of the previous release on upgrade
    pub reuse_values: bool,
    /// Wait for resources to become ready
    pub wait: bool,
    /// `--set` values
    pub set_values: BTreeMap<String, String>,
}

impl ChartOptions {
    /// Create options for a namespace
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// With kube context
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// With chart version
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// With reuse of previous values
    #[inline]
    #[must_use]
    pub fn with_reuse_values(mut self, reuse: bool) -> Self {
        self.reuse_values = reuse;
        self
    }

    /// With wait for readiness
    #[inline]
    #[must_use]
    pub fn with_wait(mut self, wait: bool) -> Self {
        self.wait = wait;
        self
    }

    /// With one `--set` value
    #[must_use]
    pub fn with_set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_values.insert(key.into(), value.into());
        self
    }

    fn scope_args(&self) -> Vec<String> {
        let mut args = vec!["--namespace".to_string(), self.namespace.clone()];
        if let Some(context) = &self.context {
            args.extend(["--kube-context".to_string(), context.clone()]);
        }
        args
    }

    fn chart_args(&self) -> Vec<String> {
        let mut args = self.scope_args();
        if let Some(version) = &self.version {
            args.extend(["--version".to_string(), version.clone()]);
        }
        if self.reuse_values {
            args.push("--reuse-values".to_string());
        }
        if self.wait {
            args.push("--wait".to_string());
        }
        for (key, value) in &self.set_values {
            args.extend(["--set".to_string(), format!("{key}={value}")]);
        }
        args
    }
}

/// Installed release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Release name
    pub name: String,
    /// Namespace
    pub namespace: String,
    /// Chart name and version
    #[serde(default)]
    pub chart: String,
    /// Release status
    #[serde(default)]
    pub status: String,
    /// Application version
    #[serde(default)]
    pub app_version: String,
}

/// Chart lifecycle operations
#[async_trait]
pub trait ChartManager: Send + Sync + Debug {
    /// Install a chart; a release that is already installed is left alone
    async fn install(&self, release: &str, chart: &str, options: &ChartOptions) -> Result<(), HelmError>;

    /// Upgrade an installed release
    async fn upgrade(&self, release: &str, chart: &str, options: &ChartOptions) -> Result<(), HelmError>;

    /// Remove a release
    async fn uninstall(&self, release: &str, options: &ChartOptions) -> Result<(), HelmError>;

    /// Releases in a namespace
    async fn list_releases(&self, options: &ChartOptions) -> Result<Vec<Release>, HelmError>;

    /// Check if a release is installed
    async fn is_installed(&self, release: &str, options: &ChartOptions) -> Result<bool, HelmError> {
        Ok(self.list_releases(options).await?.iter().any(|r| r.name == release))
    }
}

/// [`ChartManager`] backed by the `helm` binary
#[derive(Debug, Clone)]
pub struct HelmCli {
    binary: PathBuf,
}

impl HelmCli {
    /// Create bridge using the given binary
    #[inline]
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn helm(&self, args: Vec<String>) -> Result<String, HelmError> {
        let output = run(&self.binary, &args, None).await.map_err(|source| HelmError::Spawn {
            binary: self.binary.display().to_string(),
            source,
        })?;
        if output.success {
            Ok(output.stdout)
        } else {
            Err(HelmError::Command {
                command: command_line(&self.binary, &args),
                stderr: output.stderr,
            })
        }
    }
}

fn with_prefix(prefix: &[&str], rest: Vec<String>) -> Vec<String> {
    prefix.iter().map(|s| (*s).to_string()).chain(rest).collect()
}

#[async_trait]
impl ChartManager for HelmCli {
    #[tracing::instrument(skip(self, options), fields(namespace = %options.namespace))]
    async fn install(&self, release: &str, chart: &str, options: &ChartOptions) -> Result<(), HelmError> {
        if self.is_installed(release, options).await? {
            tracing::info!("release already installed");
            return Ok(());
        }
        self.helm(with_prefix(&["install", release, chart], options.chart_args()))
            .await?;
        tracing::info!("release installed");
        Ok(())
    }

    #[tracing::instrument(skip(self, options), fields(namespace = %options.namespace))]
    async fn upgrade(&self, release: &str, chart: &str, options: &ChartOptions) -> Result<(), HelmError> {
        if !self.is_installed(release, options).await? {
            return Err(HelmError::ReleaseNotFound {
                release: release.to_string(),
                namespace: options.namespace.clone(),
            });
        }
        self.helm(with_prefix(&["upgrade", release, chart], options.chart_args()))
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, options), fields(namespace = %options.namespace))]
    async fn uninstall(&self, release: &str, options: &ChartOptions) -> Result<(), HelmError> {
        match self.helm(with_prefix(&["uninstall", release], options.scope_args())).await {
            Ok(_) => Ok(()),
            Err(HelmError::Command { stderr, .. }) if stderr.contains("not found") => Err(HelmError::ReleaseNotFound {
                release: release.to_string(),
                namespace: options.namespace.clone(),
            }),
            Err(e) => Err(e),
        }
    }

    async fn list_releases(&self, options: &ChartOptions) -> Result<Vec<Release>, HelmError> {
        let out = self
            .helm(with_prefix(&["list", "--output", "json"], options.scope_args()))
            .await?;
        parse_releases(&out)
    }
}

fn parse_releases(text: &str) -> Result<Vec<Release>, HelmError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(text).map_err(|e| HelmError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn chart_args_carry_every_option() {
        let options = ChartOptions::new("solo-setup")
            .with_context("kind-c1")
            .with_version("0.44.0")
            .with_reuse_values(true)
            .with_wait(true)
            .with_set("cloud.minio.enabled", "true");
        assert_eq!(
            options.chart_args(),
            vec![
                "--namespace",
                "solo-setup",
                "--kube-context",
                "kind-c1",
                "--version",
                "0.44.0",
                "--reuse-values",
                "--wait",
                "--set",
                "cloud.minio.enabled=true",
            ]
        );
    }

    #[test]
    fn release_list_parsing() {
        let out = r#"[{"name":"solo-cluster-setup","namespace":"solo-setup","revision":"1",
            "status":"deployed","chart":"solo-cluster-setup-0.44.0","app_version":"0.44.0"}]"#;
        let releases = parse_releases(out).unwrap();
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].name, "solo-cluster-setup");
        assert_eq!(releases[0].status, "deployed");
        assert!(parse_releases("").unwrap().is_empty());
        assert!(matches!(parse_releases("{"), Err(HelmError::Parse(_))));
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let helm = HelmCli::new("/nonexistent/helm-for-tests");
        let err = helm.list_releases(&ChartOptions::new("solo")).await.unwrap_err();
        assert!(matches!(err, HelmError::Spawn { .. }));
    }
}
