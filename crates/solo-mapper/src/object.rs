//! Typed ↔ plain document conversion
//!
//! Plain documents are `serde_json::Value` trees. YAML text is parsed into the
//! same representation so ConfigMap payloads and files share one code path.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::MapperError;

/// Map a plain document to a typed model
///
/// # Errors
/// Returns error if the value does not match the model's shape
#[inline]
pub fn from_object<T: DeserializeOwned>(value: Value) -> Result<T, MapperError> {
    serde_json::from_value(value).map_err(MapperError::Json)
}

/// Map a typed model to a plain document
///
/// # Errors
/// Returns error if the model cannot be represented (non-string map keys)
#[inline]
pub fn to_object<T: Serialize>(model: &T) -> Result<Value, MapperError> {
    serde_json::to_value(model).map_err(MapperError::Json)
}

/// Parse YAML text into a plain document
///
/// Empty input yields an empty object.
///
/// # Errors
/// Returns error if YAML is invalid
pub fn from_yaml_str(yaml: &str) -> Result<Value, MapperError> {
    if yaml.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    serde_yaml::from_str(yaml).map_err(MapperError::Yaml)
}

/// Emit a plain document as YAML text
///
/// # Errors
/// Returns error if serialization fails
#[inline]
pub fn to_yaml_string(value: &Value) -> Result<String, MapperError> {
    serde_yaml::to_string(value).map_err(MapperError::Yaml)
}
