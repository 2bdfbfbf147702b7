//! Local config persistence
//!
//! The operator's local config is a YAML file. Reads lift older files to
//! the current schema and validate the result; writes go to a temporary file
//! in the same directory which is then renamed over the target.

mod prompt;

use std::io::Write;
use std::path::{Path, PathBuf};

use solo_mapper::{from_yaml_str, to_yaml_string};
use solo_model::schemas::local_config_schema;
use solo_model::LocalConfig;
use solo_schema::Schema;
use tempfile::NamedTempFile;

use crate::error::LocalConfigError;

pub use prompt::{prompt_local_config, PromptFlags, Prompter, DEFAULT_DEPLOYMENT_NAME, DEFAULT_NAMESPACE};

/// Local config file
#[derive(Debug)]
pub struct LocalConfigStore {
    path: PathBuf,
    schema: Schema<LocalConfig>,
}

impl LocalConfigStore {
    /// Create store for a file path
    ///
    /// # Errors
    /// Returns `Schema` if the local config migration chain is broken
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, LocalConfigError> {
        Ok(Self {
            path: path.into(),
            schema: local_config_schema()?,
        })
    }

    /// File path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the file exists
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read, migrate and validate the file
    ///
    /// # Errors
    /// Returns `NotFound` if there is no file, or the parse, migration or
    /// validation error that rejected it
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> Result<LocalConfig, LocalConfigError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LocalConfigError::NotFound(self.path.clone()));
            }
            Err(e) => return Err(LocalConfigError::io(&self.path, e)),
        };

        let (config, report) = self.schema.transform_with_report(&from_yaml_str(&text)?)?;
        if report.is_migrated() {
            tracing::info!(from = %report.from, applied = ?report.applied, "local config migrated");
        }
        config.validate()?;
        Ok(config)
    }

    /// Load the file if it exists
    ///
    /// # Errors
    /// Returns any load error other than a missing file
    pub async fn load_if_exists(&self) -> Result<Option<LocalConfig>, LocalConfigError> {
        match self.load().await {
            Ok(config) => Ok(Some(config)),
            Err(LocalConfigError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Validate and atomically replace the file
    ///
    /// # Errors
    /// Returns `Validation` for an invalid config or `Io` if the file cannot
    /// be written
    #[tracing::instrument(skip(self, config), fields(path = %self.path.display()))]
    pub async fn write(&self, config: &LocalConfig) -> Result<(), LocalConfigError> {
        config.validate()?;
        let yaml = to_yaml_string(&self.schema.encode(config)?)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomic(&path, yaml.as_bytes()))
            .await
            .map_err(|e| LocalConfigError::io(&self.path, std::io::Error::other(e)))??;

        tracing::debug!("local config written");
        Ok(())
    }
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), LocalConfigError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| LocalConfigError::io(dir, e))?;

    let mut file = NamedTempFile::new_in(dir).map_err(|e| LocalConfigError::io(dir, e))?;
    file.write_all(contents)
        .and_then(|()| file.as_file().sync_all())
        .map_err(|e| LocalConfigError::io(file.path(), e))?;
    file.persist(path)
        .map_err(|e| LocalConfigError::io(path, e.error))?;
    Ok(())
}
