//! Solo Object Mapper
//!
//! Converts between the three shapes configuration takes on its way through
//! the system:
//!
//! - **Plain documents**: `serde_json::Value` trees, as parsed from YAML files
//!   and ConfigMap payloads
//! - **Typed models**: serde-derived structs ([`from_object`] / [`to_object`])
//! - **Flat key maps**: dotted-path keys with string values
//!   ([`to_flat_key_map`] / [`apply_property_value`])
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use solo_mapper::{apply_property_value, to_flat_key_map};
//!
//! let mut doc = json!({"deployments": [{"name": "alpha", "realm": 0}]});
//! apply_property_value(&mut doc, "deployments.0.realm", "2").unwrap();
//!
//! let flat = to_flat_key_map(&doc);
//! assert_eq!(flat["deployments.0.realm"], "2");
//! ```

#![warn(unreachable_pub)]

mod error;
mod flat;
mod object;
mod path;

pub use error::MapperError;
pub use flat::{apply_property_value, from_flat_key_map, get_property_value, to_flat_key_map};
pub use object::{from_object, from_yaml_str, to_object, to_yaml_string};
pub use path::{as_index, PathError, PropertyPath};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
