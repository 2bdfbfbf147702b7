//! Schema migration steps
//!
//! A migration consumes documents in its [`VersionRange`] and produces a
//! document at its target version. The provided [`SchemaMigration::migrate`]
//! enforces the contract; implementors only write [`SchemaMigration::apply`].

use std::fmt::Debug;

use serde_json::{Map, Value};

use crate::error::SchemaError;
use crate::version::{SchemaVersion, VersionRange, SCHEMA_VERSION_KEY};

/// One link of a migration chain
pub trait SchemaMigration: Send + Sync + Debug {
    /// Migration name used in errors and logs
    fn name(&self) -> &'static str;

    /// Versions this migration accepts as input
    fn range(&self) -> VersionRange;

    /// Version stamped on the output
    fn version(&self) -> SchemaVersion;

    /// Transform a copy of the document body
    ///
    /// Called on a deep copy; `schemaVersion` is stamped afterwards.
    ///
    /// # Errors
    /// Returns error if the document cannot be migrated
    fn apply(&self, document: &mut Map<String, Value>) -> Result<(), SchemaError>;

    /// Migrate a document one step forward
    ///
    /// Rejects documents whose declared version is outside [`range`](Self::range),
    /// never mutates `source`, and stamps [`version`](Self::version) on the result.
    ///
    /// # Errors
    /// Returns `InvalidSchemaVersion` on a version mismatch, or whatever
    /// [`apply`](Self::apply) reports
    fn migrate(&self, source: &Value) -> Result<Value, SchemaError> {
        let declared = SchemaVersion::read(source)?;
        let range = self.range();
        if !range.contains(declared) {
            return Err(SchemaError::InvalidSchemaVersion {
                migration: self.name(),
                expected: range,
                actual: declared,
            });
        }

        let mut copy = source.clone();
        let body = copy.as_object_mut().ok_or(SchemaError::NotAnObject)?;
        self.apply(body)?;
        body.insert(SCHEMA_VERSION_KEY.to_string(), self.version().into());
        Ok(copy)
    }
}

/// Move `from` to `to` if present (no-op otherwise)
pub fn rename_field(document: &mut Map<String, Value>, from: &str, to: &str) {
    if let Some(value) = document.remove(from) {
        document.insert(to.to_string(), value);
    }
}

/// Borrow a nested object, creating it when absent
///
/// # Errors
/// Returns `MigrationFailed` if the field holds a non-object value
pub fn object_field<'a>(
    document: &'a mut Map<String, Value>,
    field: &str,
    migration: &'static str,
) -> Result<&'a mut Map<String, Value>, SchemaError> {
    let slot = document
        .entry(field.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if slot.is_null() {
        *slot = Value::Object(Map::new());
    }
    slot.as_object_mut()
        .ok_or_else(|| SchemaError::migration_failed(migration, format!("'{field}' must be an object")))
}
