//! Flat dotted-key views of plain documents
//!
//! Provides the flattened representation used for ConfigMap data, env-style
//! overrides and `local-config set`:
//! - [`to_flat_key_map`] flattens nested objects/arrays to `a.0.b` keys
//! - [`apply_property_value`] writes a single dotted path (inverse of one entry)
//! - [`from_flat_key_map`] rebuilds a document from a full flat map

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde_json::{Map, Number, Value};

use crate::error::MapperError;
use crate::path::{as_index, PropertyPath};

/// Flatten a document into dotted keys with scalar string values
///
/// Null leaves and empty containers produce no entries.
#[must_use]
pub fn to_flat_key_map(value: &Value) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    flatten_into(&PropertyPath::root(), value, &mut out);
    out
}

fn flatten_into(prefix: &PropertyPath, value: &Value, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            out.insert(prefix.to_string(), b.to_string());
        }
        Value::Number(n) => {
            out.insert(prefix.to_string(), n.to_string());
        }
        Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten_into(&prefix.child(i.to_string()), item, out);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                flatten_into(&prefix.child(key.clone()), item, out);
            }
        }
    }
}

/// Rebuild a document from a flat key map
///
/// Keys are applied in natural segment order so `a.2` precedes `a.10`.
/// All leaves are written as strings.
///
/// # Errors
/// Returns error if keys conflict (a scalar and a child under the same key)
/// or array indexes leave gaps
pub fn from_flat_key_map(entries: &BTreeMap<String, String>) -> Result<Value, MapperError> {
    let mut parsed = entries
        .iter()
        .map(|(key, value)| Ok((key.parse::<PropertyPath>()?, value)))
        .collect::<Result<Vec<_>, MapperError>>()?;
    parsed.sort_by(|(a, _), (b, _)| natural_cmp(a, b));

    let mut root = Value::Object(Map::new());
    for (path, value) in parsed {
        write_path(&mut root, &path, value)?;
    }
    Ok(root)
}

fn natural_cmp(a: &PropertyPath, b: &PropertyPath) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        let ord = match (as_index(x), as_index(y)) {
            (Some(i), Some(j)) => i.cmp(&j),
            _ => x.cmp(y),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

/// Read the value at a dotted path
///
/// Returns `Ok(None)` when any segment is missing.
///
/// # Errors
/// Returns error if the path is malformed or runs through a scalar
pub fn get_property_value<'a>(root: &'a Value, key: &str) -> Result<Option<&'a Value>, MapperError> {
    let path: PropertyPath = key.parse()?;
    let mut current = root;
    for (i, segment) in path.iter().enumerate() {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => match as_index(segment) {
                Some(idx) => items.get(idx),
                None => {
                    return Err(MapperError::NotAnIndex {
                        path: path.prefix(i).to_string(),
                        segment: segment.to_string(),
                    })
                }
            },
            _ => return Err(MapperError::not_traversable(path.prefix(i).to_string(), segment)),
        };
        match next {
            Some(value) => current = value,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}

/// Write a single dotted path
///
/// Missing intermediates are created (an array when the following segment is
/// an index, an object otherwise). An index equal to the array length appends.
/// An existing boolean or numeric leaf keeps its type and `text` must parse as
/// that type; any other leaf is written as a string.
///
/// # Errors
/// Returns error if the path is malformed, runs through a scalar, skips past
/// the end of an array, or `text` does not parse as the existing leaf type
pub fn apply_property_value(root: &mut Value, key: &str, text: &str) -> Result<(), MapperError> {
    let path: PropertyPath = key.parse()?;
    write_path(root, &path, text)
}

fn write_path(root: &mut Value, path: &PropertyPath, text: &str) -> Result<(), MapperError> {
    if !matches!(root, Value::Object(_) | Value::Array(_)) || path.is_empty() {
        return Err(MapperError::RootNotObject);
    }

    let segments = path.segments();
    let last = segments.len() - 1;
    let mut current = root;

    for (i, segment) in segments.iter().enumerate() {
        let following = segments.get(i + 1).map(String::as_str);
        current = match current {
            Value::Object(map) => {
                if i == last {
                    let leaf = coerce_leaf(map.get(segment), text, path)?;
                    map.insert(segment.clone(), leaf);
                    return Ok(());
                }
                let slot = map.entry(segment.clone()).or_insert(Value::Null);
                if slot.is_null() {
                    *slot = empty_container(following);
                }
                slot
            }
            Value::Array(items) => {
                let idx = as_index(segment).ok_or_else(|| MapperError::NotAnIndex {
                    path: path.prefix(i).to_string(),
                    segment: segment.clone(),
                })?;
                if idx > items.len() {
                    return Err(MapperError::IndexOutOfBounds {
                        path: path.prefix(i).to_string(),
                        index: idx,
                        len: items.len(),
                    });
                }
                if i == last {
                    let leaf = coerce_leaf(items.get(idx), text, path)?;
                    if idx == items.len() {
                        items.push(leaf);
                    } else {
                        items[idx] = leaf;
                    }
                    return Ok(());
                }
                if idx == items.len() {
                    items.push(Value::Null);
                }
                let slot = &mut items[idx];
                if slot.is_null() {
                    *slot = empty_container(following);
                }
                slot
            }
            _ => return Err(MapperError::not_traversable(path.prefix(i).to_string(), segment)),
        };
    }

    Ok(())
}

fn empty_container(following: Option<&str>) -> Value {
    match following.and_then(as_index) {
        Some(_) => Value::Array(Vec::new()),
        None => Value::Object(Map::new()),
    }
}

fn coerce_leaf(existing: Option<&Value>, text: &str, path: &PropertyPath) -> Result<Value, MapperError> {
    let invalid = |expected: &'static str| MapperError::InvalidScalar {
        path: path.to_string(),
        expected,
        value: text.to_string(),
    };

    match existing {
        Some(Value::Bool(_)) => text.parse::<bool>().map(Value::Bool).map_err(|_| invalid("boolean")),
        Some(Value::Number(n)) if n.is_u64() => text
            .parse::<u64>()
            .map(|v| Value::Number(v.into()))
            .map_err(|_| invalid("unsigned integer")),
        Some(Value::Number(n)) if n.is_i64() => text
            .parse::<i64>()
            .map(|v| Value::Number(v.into()))
            .map_err(|_| invalid("integer")),
        Some(Value::Number(_)) => text
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| invalid("number")),
        Some(Value::Object(_)) => Err(invalid("object")),
        Some(Value::Array(_)) => Err(invalid("array")),
        Some(Value::Null | Value::String(_)) | None => Ok(Value::String(text.to_string())),
    }
}
