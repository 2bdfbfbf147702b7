//! Solo Core - configuration management against live clusters
//!
//! Ties the typed documents of `solo-model` to Kubernetes:
//! - Loads, creates and modifies the remote config ConfigMap
//! - Serializes writers with a lease that is renewed while held
//! - Cross-checks recorded components against running pods
//! - Persists and interactively builds the local config
//! - Drives `kubectl` and `helm`
//!
//! # Example
//!
//! ```rust,ignore
//! use solo_core::{RemoteConfigManager, Target};
//!
//! # async fn example(manager: RemoteConfigManager) -> Result<(), Box<dyn std::error::Error>> {
//! let target = Target::new("kind-solo", "solo");
//! let updated = manager
//!     .modify(&target, |mut data| async move {
//!         data.set_ledger_phase(LedgerPhase::Initialized)?;
//!         Ok(data)
//!     })
//!     .await?;
//! println!("history: {:?}", updated.command_history());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod error;
mod exec;
pub mod helm;
pub mod k8;
pub mod local;
pub mod lock;
pub mod remote;

pub use config::{BinarySettings, ChartSettings, LockSettings, Settings};
pub use error::{
    HelmError, K8Error, LocalConfigError, LockError, RemoteConfigError, SettingsError, ValidatorError,
};
pub use helm::{ChartManager, ChartOptions, HelmCli, Release};
pub use k8::{ConfigMap, K8Client, KubectlClient, Pod, Target};
pub use local::{prompt_local_config, LocalConfigStore, PromptFlags, Prompter};
pub use lock::{ConfigMapLockManager, Lease, LeaseRenewal, LocalLockManager, LockManager};
pub use remote::{CreateRequest, RemoteConfigManager, RemoteConfigValidator};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
