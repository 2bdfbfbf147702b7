//! Chain-level properties of the schema engine.
//!
//! - Transforming a document that is already current changes nothing.
//! - Every version a migration produces is either current or consumed.
//! - Migration steps must match the version they are handed.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use solo_schema::{Schema, SchemaError, SchemaMigration, SchemaVersion, VersionRange};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Inventory {
    schema_version: u32,
    owner: String,
    hosts: Vec<String>,
    #[serde(default)]
    port: u16,
}

/// v0 → v1: `host` (single string) becomes `hosts`.
#[derive(Debug)]
struct HostsMigration;

impl SchemaMigration for HostsMigration {
    fn name(&self) -> &'static str {
        "HostsMigration"
    }

    fn range(&self) -> VersionRange {
        VersionRange::single(SchemaVersion::new(0))
    }

    fn version(&self) -> SchemaVersion {
        SchemaVersion::new(1)
    }

    fn apply(&self, document: &mut Map<String, Value>) -> Result<(), SchemaError> {
        let host = document.remove("host").unwrap_or(Value::Null);
        let hosts = match host {
            Value::Null => vec![],
            Value::String(h) => vec![Value::String(h)],
            other => {
                return Err(SchemaError::migration_failed(
                    self.name(),
                    format!("host must be a string, got {other}"),
                ))
            }
        };
        document.insert("hosts".into(), Value::Array(hosts));
        Ok(())
    }
}

/// v1 → v2: default port.
#[derive(Debug)]
struct PortMigration;

impl SchemaMigration for PortMigration {
    fn name(&self) -> &'static str {
        "PortMigration"
    }

    fn range(&self) -> VersionRange {
        VersionRange::single(SchemaVersion::new(1))
    }

    fn version(&self) -> SchemaVersion {
        SchemaVersion::new(2)
    }

    fn apply(&self, document: &mut Map<String, Value>) -> Result<(), SchemaError> {
        document.entry("port").or_insert(json!(50211));
        Ok(())
    }
}

fn inventory_schema() -> Schema<Inventory> {
    Schema::builder("Inventory", SchemaVersion::new(2))
        .migration(PortMigration)
        .migration(HostsMigration)
        .build()
        .unwrap()
}

#[test]
fn legacy_document_reaches_current_version() {
    let inventory = inventory_schema()
        .transform(&json!({"owner": "ops", "host": "node1"}))
        .unwrap();

    assert_eq!(inventory.schema_version, 2);
    assert_eq!(inventory.hosts, vec!["node1"]);
    assert_eq!(inventory.port, 50211);
}

#[test]
fn every_produced_version_is_consumed_or_current() {
    let schema = inventory_schema();
    for migration in schema.migrations() {
        let produced = migration.version();
        let consumed = schema
            .migrations()
            .iter()
            .filter(|m| m.range().contains(produced))
            .count();
        assert!(produced == schema.version() || consumed == 1);
    }
    assert!(schema.verify_chain().is_ok());
}

#[test]
fn step_handed_the_wrong_version_fails() {
    let err = PortMigration
        .migrate(&json!({"schemaVersion": 0, "owner": "ops"}))
        .unwrap_err();
    assert!(matches!(err, SchemaError::InvalidSchemaVersion { .. }));
}

#[test]
fn malformed_legacy_document_surfaces_migration_error() {
    let err = inventory_schema()
        .transform(&json!({"owner": "ops", "host": 7}))
        .unwrap_err();
    assert!(matches!(err, SchemaError::MigrationFailed { migration: "HostsMigration", .. }));
}

proptest! {
    #[test]
    fn transform_is_idempotent(
        owner in "[a-z]{1,10}",
        host in proptest::option::of("[a-z0-9.-]{1,16}"),
        port in proptest::option::of(1u16..),
    ) {
        let schema = inventory_schema();
        let mut legacy = json!({ "owner": owner });
        if let Some(host) = host {
            legacy["host"] = json!(host);
        }
        if let Some(port) = port {
            legacy["port"] = json!(port);
        }

        let once = schema.transform(&legacy).unwrap();
        let twice = schema.transform(&schema.encode(&once).unwrap()).unwrap();
        prop_assert_eq!(once, twice);
    }
}
