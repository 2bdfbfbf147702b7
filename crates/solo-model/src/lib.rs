//! Solo Configuration Model
//!
//! Typed documents describing a deployment and the operator's workstation.
//!
//! # Documents
//!
//! - [`RemoteConfigData`]: shared deployment state, stored in the cluster
//! - [`LocalConfig`]: operator identity, deployments, cluster contexts
//!
//! # Components
//!
//! [`ComponentsDataWrapper`] owns every [`Component`] of a deployment and is
//! the only way to change a component's [`DeploymentPhase`]. The ledger as a
//! whole moves through [`LedgerPhase`].
//!
//! # Schemas
//!
//! [`schemas::local_config_schema`] and [`schemas::remote_config_schema`]
//! lift older documents to the current shape before they are mapped to the
//! types above.

#![warn(unreachable_pub)]

mod components;
mod error;
mod local;
mod phase;
mod projection;
mod remote;
pub mod schemas;
mod types;
mod validation;

pub use components::{
    BaseComponent, Component, ComponentType, ComponentsDataWrapper, ConsensusNodeComponent, EnvoyProxyComponent,
    ExplorerComponent, HaProxyComponent, MirrorNodeComponent, RelayComponent,
};
pub use error::ModelError;
pub use local::{Deployment, LocalConfig, LocalVersions, LOCAL_CONFIG_SCHEMA_VERSION};
pub use phase::{DeploymentPhase, LedgerPhase};
pub use projection::{cluster_refs, consensus_nodes, contexts, render_fqdn, ConsensusNode};
pub use remote::{
    ApplicationVersions, Cluster, RemoteConfigData, RemoteConfigMetadata, MAX_COMMAND_HISTORY,
    REMOTE_CONFIG_SCHEMA_VERSION,
};
pub use types::{ClusterRef, ComponentId, UserIdentity, DEFAULT_DNS_BASE_DOMAIN, DEFAULT_DNS_CONSENSUS_NODE_PATTERN};
pub use validation::{is_dns_label, is_email, ValidationErrors, Violation, ViolationKind};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
