//! Schema version tags and version ranges

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SchemaError;

/// Field carrying the version tag in every persisted document
pub const SCHEMA_VERSION_KEY: &str = "schemaVersion";

/// Version number of a persisted document schema
///
/// Simple monotonic integer; documents without a tag are version 0.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SchemaVersion(u32);

impl SchemaVersion {
    /// Creates a new schema version
    #[inline]
    #[must_use]
    pub const fn new(version: u32) -> Self {
        Self(version)
    }

    /// Returns the version number
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns the next version
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Read the declared version of a plain document
    ///
    /// A missing or null `schemaVersion` reads as version 0.
    ///
    /// # Errors
    /// Returns error if the document is not an object or the tag is not a
    /// non-negative 32-bit integer
    pub fn read(document: &Value) -> Result<Self, SchemaError> {
        let map = document.as_object().ok_or(SchemaError::NotAnObject)?;
        match map.get(SCHEMA_VERSION_KEY) {
            None | Some(Value::Null) => Ok(Self(0)),
            Some(tag) => tag
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .map(Self)
                .ok_or_else(|| SchemaError::InvalidVersionField {
                    value: tag.to_string(),
                }),
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl From<SchemaVersion> for Value {
    fn from(version: SchemaVersion) -> Self {
        Value::from(version.0)
    }
}

/// Half-open `[min, max)` window of versions a migration accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionRange {
    min: SchemaVersion,
    max: SchemaVersion,
}

impl VersionRange {
    /// Create range `[min, max)`
    ///
    /// # Errors
    /// Returns error if the range is empty
    pub fn new(min: SchemaVersion, max: SchemaVersion) -> Result<Self, SchemaError> {
        if min >= max {
            return Err(SchemaError::InvalidRange {
                min: min.as_u32(),
                max: max.as_u32(),
            });
        }
        Ok(Self { min, max })
    }

    /// Range accepting exactly one version
    #[inline]
    #[must_use]
    pub const fn single(version: SchemaVersion) -> Self {
        Self {
            min: version,
            max: version.next(),
        }
    }

    /// Inclusive lower bound
    #[inline]
    #[must_use]
    pub const fn min(&self) -> SchemaVersion {
        self.min
    }

    /// Exclusive upper bound
    #[inline]
    #[must_use]
    pub const fn max(&self) -> SchemaVersion {
        self.max
    }

    /// Check if version falls inside the window
    #[inline]
    #[must_use]
    pub fn contains(&self, version: SchemaVersion) -> bool {
        self.min <= version && version < self.max
    }

    /// Check if two windows share a version
    #[inline]
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min < other.max && other.min < self.max
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.min.0, self.max.0)
    }
}
