//! Error types for solo core
//!
//! One enum per concern:
//! - [`K8Error`]: cluster API and `kubectl` failures
//! - [`LockError`]: lease acquisition, renewal and release
//! - [`HelmError`]: chart operations
//! - [`ValidatorError`]: live cluster cross-checks
//! - [`RemoteConfigError`]: remote config load, create and modify
//! - [`LocalConfigError`]: local config file and prompting
//! - [`SettingsError`]: settings file

use std::path::PathBuf;

use solo_mapper::MapperError;
use solo_model::{ClusterRef, ComponentType, ModelError, ValidationErrors};
use solo_schema::SchemaError;

/// Kubernetes errors
#[derive(Debug, thiserror::Error)]
pub enum K8Error {
    /// Resource does not exist
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        /// Resource kind
        kind: &'static str,
        /// Namespace
        namespace: String,
        /// Resource name
        name: String,
    },

    /// Resource already exists
    #[error("{kind} {namespace}/{name} already exists")]
    AlreadyExists {
        /// Resource kind
        kind: &'static str,
        /// Namespace
        namespace: String,
        /// Resource name
        name: String,
    },

    /// Resource version is stale
    #[error("{kind} {namespace}/{name} was modified concurrently")]
    Conflict {
        /// Resource kind
        kind: &'static str,
        /// Namespace
        namespace: String,
        /// Resource name
        name: String,
    },

    /// Kube context is not configured
    #[error("kube context not found: {0}")]
    ContextNotFound(String),

    /// Client binary could not be started
    #[error("failed to run {binary}: {source}")]
    Spawn {
        /// Binary path
        binary: String,
        /// Cause
        #[source]
        source: std::io::Error,
    },

    /// Client command exited with an error
    #[error("{command} failed: {stderr}")]
    Command {
        /// Command line
        command: String,
        /// Captured stderr
        stderr: String,
    },

    /// Client output could not be parsed
    #[error("unexpected {what} output: {reason}")]
    Parse {
        /// What was being parsed
        what: &'static str,
        /// Parse failure
        reason: String,
    },
}

impl K8Error {
    /// Create not found error
    pub fn not_found(kind: &'static str, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Create already exists error
    pub fn already_exists(kind: &'static str, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Create conflict error
    pub fn conflict(kind: &'static str, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Conflict {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Check if resource was missing
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if resource already existed
    #[inline]
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Check if write lost an optimistic concurrency race
    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Lease lock errors
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// Lease still held by someone else after every attempt
    #[error("could not acquire lease in {namespace} after {attempts} attempts (held by {holder})")]
    AcquireTimeout {
        /// Namespace of the lease
        namespace: String,
        /// Current holder
        holder: String,
        /// Attempts made
        attempts: u32,
    },

    /// Caller no longer holds the lease
    #[error("lease in {namespace} is no longer held by {holder_id}")]
    NotHolder {
        /// Namespace of the lease
        namespace: String,
        /// Holder id of the caller
        holder_id: String,
    },

    /// Lease renewal failed during a critical section
    #[error("lease in {namespace} lost: {reason}")]
    Lost {
        /// Namespace of the lease
        namespace: String,
        /// Renewal failure
        reason: String,
    },

    /// Lease record is unreadable
    #[error("malformed lease in {namespace}: {reason}")]
    Malformed {
        /// Namespace of the lease
        namespace: String,
        /// What is wrong
        reason: String,
    },

    /// Cluster call failed
    #[error("lease storage error: {0}")]
    K8(#[from] K8Error),
}

/// Helm errors
#[derive(Debug, thiserror::Error)]
pub enum HelmError {
    /// Release does not exist
    #[error("release {release} not found in {namespace}")]
    ReleaseNotFound {
        /// Release name
        release: String,
        /// Namespace
        namespace: String,
    },

    /// Helm binary could not be started
    #[error("failed to run {binary}: {source}")]
    Spawn {
        /// Binary path
        binary: String,
        /// Cause
        #[source]
        source: std::io::Error,
    },

    /// Helm exited with an error
    #[error("{command} failed: {stderr}")]
    Command {
        /// Command line
        command: String,
        /// Captured stderr
        stderr: String,
    },

    /// Helm output could not be parsed
    #[error("unexpected helm output: {0}")]
    Parse(String),
}

/// Live cluster validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidatorError {
    /// Component recorded in the remote config has no pods
    #[error("{component_type} '{name}' not found in {namespace} on cluster {cluster}")]
    ComponentNotFound {
        /// Component type
        component_type: ComponentType,
        /// Component name
        name: String,
        /// Namespace searched
        namespace: String,
        /// Cluster searched
        cluster: ClusterRef,
    },

    /// Cluster has no kube context
    #[error("no context mapped for cluster {0}")]
    ContextNotMapped(ClusterRef),

    /// Cluster call failed
    #[error("cluster error: {0}")]
    K8(#[from] K8Error),
}

/// Remote config errors
#[derive(Debug, thiserror::Error)]
pub enum RemoteConfigError {
    /// No remote config in the namespace
    #[error("remote config not found in {namespace} (context {context})")]
    NotFound {
        /// Namespace
        namespace: String,
        /// Kube context
        context: String,
    },

    /// Remote config already present
    #[error("remote config already exists in {namespace} (context {context})")]
    AlreadyExists {
        /// Namespace
        namespace: String,
        /// Kube context
        context: String,
    },

    /// More than one ConfigMap matched the remote config selector
    #[error("{count} remote configs found in {namespace}")]
    Ambiguous {
        /// Namespace
        namespace: String,
        /// Matches found
        count: usize,
    },

    /// ConfigMap carries no payload
    #[error("ConfigMap {namespace}/{name} has no '{key}' entry")]
    MissingPayload {
        /// Namespace
        namespace: String,
        /// ConfigMap name
        name: String,
        /// Expected data key
        key: &'static str,
    },

    /// Projection requested before any load
    #[error("remote config is not loaded")]
    NotLoaded,

    /// Modify callback rejected the change
    #[error("modification aborted: {0}")]
    Aborted(String),

    /// Schema migration failed
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// YAML payload failed to parse or render
    #[error("payload error: {0}")]
    Mapping(#[from] MapperError),

    /// Model operation failed
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Document failed validation
    #[error("invalid remote config: {0}")]
    Validation(#[from] ValidationErrors),

    /// Cluster call failed
    #[error("cluster error: {0}")]
    K8(#[from] K8Error),

    /// Lease failure
    #[error("lock error: {0}")]
    Lock(#[from] LockError),

    /// Live validation failed
    #[error("validation against cluster failed: {0}")]
    Validator(#[from] ValidatorError),
}

impl RemoteConfigError {
    /// Create callback abort
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::Aborted(reason.into())
    }

    /// Check if the remote config was missing
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::K8(e) => e.is_not_found(),
            _ => false,
        }
    }
}

/// Local config errors
#[derive(Debug, thiserror::Error)]
pub enum LocalConfigError {
    /// No local config file yet
    #[error("local config not found at {}", .0.display())]
    NotFound(PathBuf),

    /// File system failure
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        /// File path
        path: PathBuf,
        /// Cause
        #[source]
        source: std::io::Error,
    },

    /// Quiet mode without a value for a required field
    #[error("no value for {0} (pass it as a flag or run without --quiet)")]
    MissingValue(&'static str),

    /// Interactive prompt failed
    #[error("prompt failed: {0}")]
    Prompt(String),

    /// Schema migration failed
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// YAML failed to parse or render
    #[error("format error: {0}")]
    Mapping(#[from] MapperError),

    /// Model operation failed
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Document failed validation
    #[error("invalid local config: {0}")]
    Validation(#[from] ValidationErrors),

    /// Cluster call failed
    #[error("cluster error: {0}")]
    K8(#[from] K8Error),
}

impl LocalConfigError {
    /// Create I/O error for a path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Settings errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Neither `SOLO_HOME` nor `HOME` is set
    #[error("cannot determine solo home directory (set SOLO_HOME)")]
    NoHome,

    /// Settings file unreadable
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// File path
        path: PathBuf,
        /// Cause
        #[source]
        source: std::io::Error,
    },

    /// Settings file malformed
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        /// File path
        path: PathBuf,
        /// Cause
        #[source]
        source: toml::de::Error,
    },

    /// Settings parse but cannot be used
    #[error("invalid settings in {}: {reason}", .path.display())]
    Invalid {
        /// File path
        path: PathBuf,
        /// What is wrong
        reason: String,
    },
}
