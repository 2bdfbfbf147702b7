//! Interactive creation of the local config
//!
//! Each value comes from the first source that has one:
//! 1. command line flags
//! 2. the existing local config
//! 3. in quiet mode, the current kube context or a default
//! 4. an interactive prompt

use std::collections::BTreeMap;
use std::fmt::Debug;

use async_trait::async_trait;
use solo_model::{is_dns_label, is_email, ClusterRef, Deployment, LocalConfig, UserIdentity};

use super::LocalConfigStore;
use crate::error::{K8Error, LocalConfigError};
use crate::k8::K8Client;

/// Deployment name offered when none is given
pub const DEFAULT_DEPLOYMENT_NAME: &str = "solo-deployment";

/// Namespace offered when none is given
pub const DEFAULT_NAMESPACE: &str = "solo";

const MAX_PROMPT_ATTEMPTS: usize = 3;

/// Source of interactive answers
#[async_trait]
pub trait Prompter: Send + Sync + Debug {
    /// Ask a question; an empty answer selects `default`
    async fn input(&self, question: &str, default: Option<&str>) -> Result<String, LocalConfigError>;
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptFlags {
    /// Operator email address
    pub email: Option<String>,
    /// Deployment name
    pub deployment: Option<String>,
    /// Deployment namespace
    pub namespace: Option<String>,
    /// Cluster refs of the deployment
    pub clusters: Vec<ClusterRef>,
    /// Kube context for clusters without a mapping
    pub context: Option<String>,
    /// Never prompt
    pub quiet: bool,
}

impl PromptFlags {
    /// Create empty flags
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With email
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// With deployment name and namespace
    #[must_use]
    pub fn with_deployment(mut self, name: impl Into<String>, namespace: impl Into<String>) -> Self {
        self.deployment = Some(name.into());
        self.namespace = Some(namespace.into());
        self
    }

    /// With cluster refs
    #[must_use]
    pub fn with_clusters(mut self, clusters: Vec<ClusterRef>) -> Self {
        self.clusters = clusters;
        self
    }

    /// With kube context
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// With quiet mode
    #[inline]
    #[must_use]
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }
}

struct Resolver<'a> {
    flags: &'a PromptFlags,
    prompter: &'a dyn Prompter,
}

impl Resolver<'_> {
    /// Ask until `valid` accepts the answer
    async fn ask(
        &self,
        field: &'static str,
        question: &str,
        default: Option<&str>,
        valid: fn(&str) -> bool,
    ) -> Result<String, LocalConfigError> {
        if self.flags.quiet {
            return default.map(str::to_string).ok_or(LocalConfigError::MissingValue(field));
        }
        for _ in 0..MAX_PROMPT_ATTEMPTS {
            let answer = self.prompter.input(question, default).await?;
            let answer = match answer.trim() {
                "" => default.unwrap_or_default().to_string(),
                text => text.to_string(),
            };
            if valid(&answer) {
                return Ok(answer);
            }
            tracing::warn!(field, answer = %answer, "rejected answer");
        }
        Err(LocalConfigError::Prompt(format!("no valid {field} after {MAX_PROMPT_ATTEMPTS} attempts")))
    }
}

fn non_empty(text: &str) -> bool {
    !text.trim().is_empty()
}

fn cluster_list(text: &str) -> bool {
    text.split(',').map(str::trim).any(|c| !c.is_empty())
}

fn parse_clusters(text: &str) -> Vec<ClusterRef> {
    text.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(ClusterRef::from)
        .collect()
}

/// Build or update the local config and write it
///
/// # Errors
/// Returns `MissingValue` in quiet mode when a required value has no
/// source, `K8` if a context is not configured, or the validation and write
/// errors of the resulting config
#[tracing::instrument(skip_all, fields(path = %store.path().display(), quiet = flags.quiet))]
pub async fn prompt_local_config(
    store: &LocalConfigStore,
    flags: &PromptFlags,
    prompter: &dyn Prompter,
    k8: &dyn K8Client,
    identity: UserIdentity,
) -> Result<LocalConfig, LocalConfigError> {
    let existing = store.load_if_exists().await?;
    let resolver = Resolver { flags, prompter };

    let email = match (flags.email.clone(), &existing) {
        (Some(email), _) => email,
        (None, Some(existing)) => existing.user_email_address().to_string(),
        (None, None) => resolver.ask("email", "User email address", None, is_email).await?,
    };

    let mut config = match existing {
        Some(mut config) => {
            config.set_user_email_address(email)?;
            config.set_user_identity(identity)?;
            config
        }
        None => LocalConfig::new(email, identity)?,
    };

    let deployment = match flags.deployment.clone() {
        Some(name) => name,
        None => {
            resolver
                .ask("deployment", "Deployment name", Some(DEFAULT_DEPLOYMENT_NAME), non_empty)
                .await?
        }
    };
    let known = config.deployment(&deployment).cloned();

    let namespace = match (&flags.namespace, &known) {
        (Some(namespace), _) => namespace.clone(),
        (None, Some(known)) => known.namespace.clone(),
        (None, None) => {
            resolver
                .ask("namespace", "Deployment namespace", Some(DEFAULT_NAMESPACE), is_dns_label)
                .await?
        }
    };

    let available = k8.list_contexts().await?;
    let current_context = k8.current_context().await.ok().filter(|c| !c.is_empty());

    let clusters = match (flags.clusters.is_empty(), &known) {
        (false, _) => flags.clusters.clone(),
        (true, Some(known)) => known.clusters.clone(),
        (true, None) => parse_clusters(
            &resolver
                .ask("clusters", "Cluster refs (comma separated)", current_context.as_deref(), cluster_list)
                .await?,
        ),
    };

    let mut contexts = BTreeMap::new();
    for cluster in &clusters {
        let context = match (&flags.context, config.context_for(cluster)) {
            (Some(context), _) => context.clone(),
            (None, Some(mapped)) => mapped.to_string(),
            (None, None) => {
                let question = format!("Kube context for cluster {cluster}");
                resolver
                    .ask("context", &question, current_context.as_deref(), non_empty)
                    .await?
            }
        };
        if !available.iter().any(|c| *c == context) {
            return Err(K8Error::ContextNotFound(context).into());
        }
        contexts.insert(cluster.clone(), context);
    }

    for (cluster, context) in contexts {
        config.set_cluster_context(cluster, context)?;
    }
    let mut entry = Deployment::new(&deployment, namespace, clusters);
    if let Some(known) = known {
        entry.realm = known.realm;
        entry.shard = known.shard;
    }
    config.add_deployment(entry)?;
    config.set_current_deployment(deployment)?;

    store.write(&config).await?;
    tracing::info!(deployment = ?config.current_deployment_name(), "local config saved");
    Ok(config)
}
