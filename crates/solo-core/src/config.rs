//! Settings
//!
//! Optional TOML file at `$SOLO_HOME/settings.toml`. Every field has a
//! default, so a missing file or a partial file is fine. Settings are passed
//! down explicitly; nothing reads them from a global.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use solo_model::{ApplicationVersions, DEFAULT_DNS_BASE_DOMAIN, DEFAULT_DNS_CONSENSUS_NODE_PATTERN, MAX_COMMAND_HISTORY};

use crate::error::SettingsError;

/// Environment variable overriding the home directory
pub const SOLO_HOME_ENV: &str = "SOLO_HOME";

/// Settings file name inside the home directory
pub const SETTINGS_FILE: &str = "settings.toml";

/// Local config file name inside the home directory
pub const LOCAL_CONFIG_FILE: &str = "local-config.yaml";

/// Longest accepted lease
pub const MAX_LEASE_DURATION_SECS: u64 = 24 * 60 * 60;

/// Lease lock tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockSettings {
    /// Acquisition attempts before giving up
    pub acquire_attempts: u32,
    /// Delay between attempts in milliseconds
    pub acquire_delay_ms: u64,
    /// Lease validity in seconds
    pub lease_duration_secs: u64,
    /// Renewal period in milliseconds
    pub renew_interval_ms: u64,
}

impl LockSettings {
    /// Delay between attempts
    #[inline]
    #[must_use]
    pub fn acquire_delay(&self) -> Duration {
        Duration::from_millis(self.acquire_delay_ms)
    }

    /// Renewal period
    #[inline]
    #[must_use]
    pub fn renew_interval(&self) -> Duration {
        Duration::from_millis(self.renew_interval_ms)
    }

    /// Check the lease can be held safely
    ///
    /// A holder must renew at least twice per lease period.
    ///
    /// # Errors
    /// Returns the reason the tuning is unusable
    pub fn validate(&self) -> Result<(), String> {
        if self.acquire_attempts == 0 {
            return Err("lock.acquire_attempts must be at least 1".to_string());
        }
        if !(1..=MAX_LEASE_DURATION_SECS).contains(&self.lease_duration_secs) {
            return Err(format!(
                "lock.lease_duration_secs must be between 1 and {MAX_LEASE_DURATION_SECS}"
            ));
        }
        let half_lease_ms = self.lease_duration_secs * 1_000 / 2;
        if self.renew_interval_ms == 0 || self.renew_interval_ms > half_lease_ms {
            return Err(format!(
                "lock.renew_interval_ms must be between 1 and {half_lease_ms} (half the lease)"
            ));
        }
        Ok(())
    }
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            acquire_attempts: 10,
            acquire_delay_ms: 2_000,
            lease_duration_secs: 20,
            renew_interval_ms: 5_000,
        }
    }
}

/// External binaries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinarySettings {
    /// `kubectl` path
    pub kubectl: PathBuf,
    /// `helm` path
    pub helm: PathBuf,
}

impl Default for BinarySettings {
    fn default() -> Self {
        Self {
            kubectl: PathBuf::from("kubectl"),
            helm: PathBuf::from("helm"),
        }
    }
}

/// Chart locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSettings {
    /// Chart installed by `cluster setup`
    pub cluster_setup_chart: String,
    /// Release name of the cluster setup chart
    pub cluster_setup_release: String,
    /// Namespace of cluster-wide components
    pub cluster_setup_namespace: String,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            cluster_setup_chart: "oci://ghcr.io/hashgraph/solo-charts/solo-cluster-setup".to_string(),
            cluster_setup_release: "solo-cluster-setup".to_string(),
            cluster_setup_namespace: "solo-setup".to_string(),
        }
    }
}

/// Solo settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Home directory holding the local config
    pub home: PathBuf,
    /// Command history bound
    pub max_command_history: usize,
    /// Lease tuning
    pub lock: LockSettings,
    /// External binaries
    pub binaries: BinarySettings,
    /// Chart locations
    pub charts: ChartSettings,
    /// Default versions recorded on new deployments
    pub versions: ApplicationVersions,
    /// Default DNS base domain for new clusters
    pub dns_base_domain: String,
    /// Default consensus node service pattern for new clusters
    pub dns_consensus_node_pattern: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            home: PathBuf::from(".solo"),
            max_command_history: MAX_COMMAND_HISTORY,
            lock: LockSettings::default(),
            binaries: BinarySettings::default(),
            charts: ChartSettings::default(),
            versions: ApplicationVersions::default(),
            dns_base_domain: DEFAULT_DNS_BASE_DOMAIN.to_string(),
            dns_consensus_node_pattern: DEFAULT_DNS_CONSENSUS_NODE_PATTERN.to_string(),
        }
    }
}

impl Settings {
    /// Create default settings
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With home directory
    #[inline]
    #[must_use]
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = home.into();
        self
    }

    /// With command history bound
    #[inline]
    #[must_use]
    pub fn with_max_command_history(mut self, max: usize) -> Self {
        self.max_command_history = max;
        self
    }

    /// With lease tuning
    #[inline]
    #[must_use]
    pub fn with_lock(mut self, lock: LockSettings) -> Self {
        self.lock = lock;
        self
    }

    /// With binaries
    #[inline]
    #[must_use]
    pub fn with_binaries(mut self, binaries: BinarySettings) -> Self {
        self.binaries = binaries;
        self
    }

    /// Local config file path
    #[must_use]
    pub fn local_config_path(&self) -> PathBuf {
        self.home.join(LOCAL_CONFIG_FILE)
    }

    /// Resolve the home directory
    ///
    /// Precedence: explicit path, `SOLO_HOME`, then `$HOME/.solo`.
    ///
    /// # Errors
    /// Returns `NoHome` if nothing is set
    pub fn resolve_home(explicit: Option<&Path>) -> Result<PathBuf, SettingsError> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        if let Some(home) = std::env::var_os(SOLO_HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(home));
        }
        std::env::var_os("HOME")
            .filter(|v| !v.is_empty())
            .map(|home| PathBuf::from(home).join(".solo"))
            .ok_or(SettingsError::NoHome)
    }

    /// Parse settings from TOML text
    ///
    /// # Errors
    /// Returns `Parse` if the text is not valid settings TOML and `Invalid`
    /// if the lock tuning is unusable
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(text).map_err(|source| SettingsError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        settings.lock.validate().map_err(|reason| SettingsError::Invalid {
            path: origin.to_path_buf(),
            reason,
        })?;
        Ok(settings)
    }

    /// Load settings for a home directory
    ///
    /// Reads `settings.toml` when present; the resolved home always wins
    /// over a `home` entry in the file.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(home: &Path) -> Result<Self, SettingsError> {
        let path = home.join(SETTINGS_FILE);
        let settings = match std::fs::read_to_string(&path) {
            Ok(text) => Self::from_toml_str(&text, &path)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                Self::default()
            }
            Err(source) => return Err(SettingsError::Read { path, source }),
        };
        Ok(settings.with_home(home))
    }
}
