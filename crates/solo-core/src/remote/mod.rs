//! Remote config
//!
//! The deployment's shared state lives in one ConfigMap in the deployment
//! namespace, as YAML under [`REMOTE_CONFIG_DATA_KEY`].
//! - [`RemoteConfigManager`]: load, create and leased modification
//! - [`RemoteConfigValidator`]: checks recorded components have pods

mod manager;
mod validator;

pub use manager::{CreateRequest, RemoteConfigManager};
pub use validator::{pod_selector, RemoteConfigValidator, NODE_NAME_LABEL};

/// Remote config ConfigMap name
pub const REMOTE_CONFIG_NAME: &str = "solo-remote-config";

/// Remote config label key
pub const REMOTE_CONFIG_LABEL_KEY: &str = "solo.hedera.com/type";

/// Remote config label value
pub const REMOTE_CONFIG_LABEL_VALUE: &str = "remote-config";

/// Data key holding the YAML document
pub const REMOTE_CONFIG_DATA_KEY: &str = "remote-config-data";
