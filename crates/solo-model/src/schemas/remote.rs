//! Remote config schema chain
//!
//! - v0: `clusters` maps cluster ref to namespace, `lastUpdateBy` is a
//!   plain string, components are keyed by name and carry `state`
//! - v1: `clusters` becomes an array of cluster entries with DNS settings,
//!   `lastUpdatedBy` becomes an identity object
//! - v2: components become arrays with numeric ids and `phase`, relays
//!   reference consensus nodes by node id, `ledgerPhase` is explicit

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};
use solo_schema::{object_field, rename_field, Schema, SchemaError, SchemaMigration, SchemaVersion, VersionRange};

use crate::phase::DeploymentPhase;
use crate::remote::{RemoteConfigData, REMOTE_CONFIG_SCHEMA_VERSION};
use crate::types::{DEFAULT_DNS_BASE_DOMAIN, DEFAULT_DNS_CONSENSUS_NODE_PATTERN};

/// Schema name used in errors and logs
pub const REMOTE_CONFIG_SCHEMA_NAME: &str = "RemoteConfig";

/// Build the remote config schema
///
/// # Errors
/// Returns error if the migration chain is broken
pub fn remote_config_schema() -> Result<Schema<RemoteConfigData>, SchemaError> {
    Schema::builder(
        REMOTE_CONFIG_SCHEMA_NAME,
        SchemaVersion::new(REMOTE_CONFIG_SCHEMA_VERSION),
    )
    .migration(RemoteConfigV1Migration)
    .migration(RemoteConfigV2Migration)
    .build()
}

/// v0 to v1: cluster entries and writer identity
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoteConfigV1Migration;

impl SchemaMigration for RemoteConfigV1Migration {
    fn name(&self) -> &'static str {
        "RemoteConfigV1Migration"
    }

    fn range(&self) -> VersionRange {
        VersionRange::single(SchemaVersion::new(0))
    }

    fn version(&self) -> SchemaVersion {
        SchemaVersion::new(1)
    }

    fn apply(&self, document: &mut Map<String, Value>) -> Result<(), SchemaError> {
        let metadata = object_field(document, "metadata", self.name())?;
        rename_field(metadata, "lastUpdateBy", "lastUpdatedBy");
        if let Some(Value::String(name)) = metadata.get("lastUpdatedBy") {
            let identity = json!({ "name": name, "hostname": "unknown" });
            metadata.insert("lastUpdatedBy".to_string(), identity);
        }
        if !metadata.contains_key("deploymentName") {
            if let Some(namespace) = metadata.get("namespace").cloned() {
                metadata.insert("deploymentName".to_string(), namespace);
            }
        }
        if !metadata.contains_key("createdAt") {
            if let Some(updated) = metadata.get("lastUpdatedAt").cloned() {
                metadata.insert("createdAt".to_string(), updated);
            }
        }
        let deployment = metadata.get("deploymentName").and_then(Value::as_str).map(str::to_string);

        let clusters = match document.remove("clusters") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Object(by_ref)) => by_ref
                .into_iter()
                .map(|(name, namespace)| {
                    let namespace = namespace.as_str().ok_or_else(|| {
                        SchemaError::migration_failed(
                            self.name(),
                            format!("cluster '{name}' namespace must be a string"),
                        )
                    })?;
                    Ok(json!({
                        "name": name,
                        "namespace": namespace,
                        "deployment": deployment.as_deref().unwrap_or(namespace),
                        "dnsBaseDomain": DEFAULT_DNS_BASE_DOMAIN,
                        "dnsConsensusNodePattern": DEFAULT_DNS_CONSENSUS_NODE_PATTERN,
                    }))
                })
                .collect::<Result<_, SchemaError>>()?,
            Some(other) => {
                return Err(SchemaError::migration_failed(
                    self.name(),
                    format!("'clusters' must be a map, got {other}"),
                ))
            }
        };
        document.insert("clusters".to_string(), Value::Array(clusters));
        Ok(())
    }
}

/// v1 to v2: component arrays with ids and phases
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoteConfigV2Migration;

/// Legacy component map key and its v2 array key
const COMPONENT_KEYS: [(&str, &str); 5] = [
    ("relays", "relays"),
    ("haProxies", "haProxies"),
    ("envoyProxies", "envoyProxies"),
    ("mirrorNodes", "mirrorNodes"),
    ("mirrorNodeExplorers", "explorers"),
];

impl SchemaMigration for RemoteConfigV2Migration {
    fn name(&self) -> &'static str {
        "RemoteConfigV2Migration"
    }

    fn range(&self) -> VersionRange {
        VersionRange::single(SchemaVersion::new(1))
    }

    fn version(&self) -> SchemaVersion {
        SchemaVersion::new(2)
    }

    fn apply(&self, document: &mut Map<String, Value>) -> Result<(), SchemaError> {
        let components = object_field(document, "components", self.name())?;

        let mut aliases = BTreeMap::new();
        let mut nodes = Vec::new();
        for (name, entry) in self.take_map(components, "consensusNodes")? {
            let mut entry = self.component_entry(&name, entry)?;
            let node_id = entry.get("nodeId").and_then(Value::as_u64).ok_or_else(|| {
                SchemaError::migration_failed(
                    self.name(),
                    format!("consensus node '{name}' has no numeric nodeId"),
                )
            })?;
            entry.insert("id".to_string(), json!(node_id));
            aliases.insert(name, node_id);
            nodes.push(Value::Object(entry));
        }
        components.insert("consensusNodes".to_string(), Value::Array(nodes));

        for (legacy_key, key) in COMPONENT_KEYS {
            let mut converted = Vec::new();
            for (index, (name, entry)) in self.take_map(components, legacy_key)?.into_iter().enumerate() {
                let mut entry = self.component_entry(&name, entry)?;
                entry.insert("id".to_string(), json!(index));
                if key == "relays" {
                    self.resolve_aliases(&name, &mut entry, &aliases)?;
                }
                converted.push(Value::Object(entry));
            }
            components.insert(key.to_string(), Value::Array(converted));
        }

        document
            .entry("ledgerPhase")
            .or_insert_with(|| json!("uninitialized"));
        Ok(())
    }
}

impl RemoteConfigV2Migration {
    fn take_map(&self, components: &mut Map<String, Value>, key: &str) -> Result<Map<String, Value>, SchemaError> {
        match components.remove(key) {
            None | Some(Value::Null) => Ok(Map::new()),
            Some(Value::Object(by_name)) => Ok(by_name),
            Some(other) => Err(SchemaError::migration_failed(
                self.name(),
                format!("components.{key} must be a map, got {other}"),
            )),
        }
    }

    fn component_entry(&self, name: &str, entry: Value) -> Result<Map<String, Value>, SchemaError> {
        let Value::Object(mut entry) = entry else {
            return Err(SchemaError::migration_failed(
                self.name(),
                format!("component '{name}' must be an object"),
            ));
        };
        entry.insert("name".to_string(), json!(name));
        let phase = match entry.remove("state") {
            None | Some(Value::Null) => DeploymentPhase::Deployed,
            Some(Value::String(state)) => legacy_phase(&state).ok_or_else(|| {
                SchemaError::migration_failed(
                    self.name(),
                    format!("component '{name}' has unknown state '{state}'"),
                )
            })?,
            Some(other) => {
                return Err(SchemaError::migration_failed(
                    self.name(),
                    format!("component '{name}' state must be a string, got {other}"),
                ))
            }
        };
        entry.insert("phase".to_string(), json!(phase.as_str()));
        Ok(entry)
    }

    fn resolve_aliases(
        &self,
        name: &str,
        entry: &mut Map<String, Value>,
        aliases: &BTreeMap<String, u64>,
    ) -> Result<(), SchemaError> {
        let legacy = entry.remove("consensusNodeAliases").unwrap_or(Value::Array(Vec::new()));
        let Value::Array(legacy) = legacy else {
            return Err(SchemaError::migration_failed(
                self.name(),
                format!("relay '{name}' consensusNodeAliases must be a list"),
            ));
        };
        let ids = legacy
            .iter()
            .map(|alias| {
                alias
                    .as_str()
                    .and_then(|alias| aliases.get(alias))
                    .map(|id| json!(id))
                    .ok_or_else(|| {
                        SchemaError::migration_failed(
                            self.name(),
                            format!("relay '{name}' references unknown consensus node {alias}"),
                        )
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        entry.insert("consensusNodeIds".to_string(), Value::Array(ids));
        Ok(())
    }
}

fn legacy_phase(state: &str) -> Option<DeploymentPhase> {
    match state {
        "non-deployed" => Some(DeploymentPhase::Requested),
        "setup" | "initialized" => Some(DeploymentPhase::Configured),
        "active" => Some(DeploymentPhase::Started),
        "destroyed" => Some(DeploymentPhase::Stopped),
        other => other.parse().ok(),
    }
}
