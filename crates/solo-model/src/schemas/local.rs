//! Local config schema chain
//!
//! - v0: untagged file, `deployments` keyed by name, optional `soloVersion`
//! - v1: adds `userIdentity`, moves `soloVersion` to `versions.cli`
//! - v2: `deployments` becomes an array with explicit `name`, `realm`, `shard`

use serde_json::{json, Map, Value};
use solo_schema::{object_field, Schema, SchemaError, SchemaMigration, SchemaVersion, VersionRange};

use crate::local::{LocalConfig, LOCAL_CONFIG_SCHEMA_VERSION};

/// Schema name used in errors and logs
pub const LOCAL_CONFIG_SCHEMA_NAME: &str = "LocalConfig";

/// Build the local config schema
///
/// # Errors
/// Returns error if the migration chain is broken
pub fn local_config_schema() -> Result<Schema<LocalConfig>, SchemaError> {
    Schema::builder(
        LOCAL_CONFIG_SCHEMA_NAME,
        SchemaVersion::new(LOCAL_CONFIG_SCHEMA_VERSION),
    )
    .migration(LocalConfigV1Migration)
    .migration(LocalConfigV2Migration)
    .build()
}

/// v0 to v1: operator identity and version pins
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalConfigV1Migration;

impl SchemaMigration for LocalConfigV1Migration {
    fn name(&self) -> &'static str {
        "LocalConfigV1Migration"
    }

    fn range(&self) -> VersionRange {
        VersionRange::single(SchemaVersion::new(0))
    }

    fn version(&self) -> SchemaVersion {
        SchemaVersion::new(1)
    }

    fn apply(&self, document: &mut Map<String, Value>) -> Result<(), SchemaError> {
        if !document.contains_key("userIdentity") {
            let user = document
                .get("userEmailAddress")
                .and_then(Value::as_str)
                .and_then(|email| email.split('@').next())
                .filter(|local| !local.is_empty())
                .unwrap_or("unknown")
                .to_string();
            document.insert(
                "userIdentity".to_string(),
                json!({ "name": user, "hostname": "unknown" }),
            );
        }

        let solo_version = document.remove("soloVersion");
        let versions = object_field(document, "versions", self.name())?;
        if !versions.contains_key("cli") {
            let cli = solo_version
                .as_ref()
                .and_then(Value::as_str)
                .unwrap_or("0.0.0");
            versions.insert("cli".to_string(), json!(cli));
        }
        Ok(())
    }
}

/// v1 to v2: deployments keyed map to array
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalConfigV2Migration;

impl SchemaMigration for LocalConfigV2Migration {
    fn name(&self) -> &'static str {
        "LocalConfigV2Migration"
    }

    fn range(&self) -> VersionRange {
        VersionRange::single(SchemaVersion::new(1))
    }

    fn version(&self) -> SchemaVersion {
        SchemaVersion::new(2)
    }

    fn apply(&self, document: &mut Map<String, Value>) -> Result<(), SchemaError> {
        let deployments = match document.remove("deployments") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Object(by_name)) => by_name
                .into_iter()
                .map(|(name, entry)| self.deployment_entry(name, entry))
                .collect::<Result<_, _>>()?,
            Some(other) => {
                return Err(SchemaError::migration_failed(
                    self.name(),
                    format!("'deployments' must be a map, got {other}"),
                ))
            }
        };
        document.insert("deployments".to_string(), Value::Array(deployments));
        Ok(())
    }
}

impl LocalConfigV2Migration {
    fn deployment_entry(&self, name: String, entry: Value) -> Result<Value, SchemaError> {
        let Value::Object(mut entry) = entry else {
            return Err(SchemaError::migration_failed(
                self.name(),
                format!("deployment '{name}' must be an object"),
            ));
        };
        entry.insert("name".to_string(), Value::String(name));
        entry.entry("realm").or_insert(json!(0));
        entry.entry("shard").or_insert(json!(0));
        Ok(Value::Object(entry))
    }
}
