//! Error types for the object mapper

use crate::path::PathError;

/// Object mapper error types
#[derive(Debug, thiserror::Error)]
pub enum MapperError {
    /// Malformed dotted path
    #[error("invalid property path: {0}")]
    Path(#[from] PathError),

    /// Path runs through a value that is neither object nor array
    #[error("cannot traverse '{segment}' at '{path}': value is a scalar")]
    NotTraversable {
        /// Path up to the scalar
        path: String,
        /// Segment that could not be resolved
        segment: String,
    },

    /// Array segment is not an index
    #[error("'{segment}' at '{path}' is not an array index")]
    NotAnIndex {
        /// Path up to the array
        path: String,
        /// Offending segment
        segment: String,
    },

    /// Array index past the end (appending at `len` is allowed)
    #[error("index {index} out of bounds at '{path}' (len {len})")]
    IndexOutOfBounds {
        /// Path up to the array
        path: String,
        /// Requested index
        index: usize,
        /// Current array length
        len: usize,
    },

    /// Text does not parse as the type of the existing leaf
    #[error("value '{value}' for '{path}' is not a valid {expected}")]
    InvalidScalar {
        /// Full property path
        path: String,
        /// Expected scalar kind
        expected: &'static str,
        /// Offending text
        value: String,
    },

    /// Root of a write is not an object
    #[error("document root must be an object")]
    RootNotObject,

    /// Typed conversion failed
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parse/emit failed
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl MapperError {
    /// Create not-traversable error
    pub(crate) fn not_traversable(path: impl Into<String>, segment: impl Into<String>) -> Self {
        Self::NotTraversable {
            path: path.into(),
            segment: segment.into(),
        }
    }
}
