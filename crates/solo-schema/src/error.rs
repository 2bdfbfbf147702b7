//! Error types for schema handling
//!
//! Every variant is fatal for the document being processed: a document is
//! never coerced to a version the chain cannot prove.

use solo_mapper::MapperError;

use crate::version::{SchemaVersion, VersionRange};

/// Schema and migration errors
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Migration received a document outside its accepted window
    #[error("invalid schema version for {migration}: expected {expected}, got {actual}")]
    InvalidSchemaVersion {
        /// Migration name
        migration: &'static str,
        /// Accepted window
        expected: VersionRange,
        /// Declared document version
        actual: SchemaVersion,
    },

    /// No migration accepts an intermediate version
    #[error("schema '{schema}' has no migration from {version} (current {current})")]
    MissingMigration {
        /// Schema name
        schema: &'static str,
        /// Version without a migration
        version: SchemaVersion,
        /// Current schema version
        current: SchemaVersion,
    },

    /// Document is newer than this build understands
    #[error("schema '{schema}' document version {version} is newer than supported {current}")]
    ForwardIncompatible {
        /// Schema name
        schema: &'static str,
        /// Declared document version
        version: SchemaVersion,
        /// Current schema version
        current: SchemaVersion,
    },

    /// `schemaVersion` is not a non-negative integer
    #[error("invalid schemaVersion field: {value}")]
    InvalidVersionField {
        /// Raw field value
        value: String,
    },

    /// Document root is not an object
    #[error("document root must be an object")]
    NotAnObject,

    /// Empty version window
    #[error("invalid version range [{min}, {max})")]
    InvalidRange {
        /// Lower bound
        min: u32,
        /// Upper bound
        max: u32,
    },

    /// A migration produces a version nothing consumes
    #[error("schema '{schema}': {migration} produces {version} which no migration accepts")]
    BrokenChain {
        /// Schema name
        schema: &'static str,
        /// Migration name
        migration: &'static str,
        /// Orphaned version
        version: SchemaVersion,
    },

    /// Two migrations accept the same version
    #[error("schema '{schema}': migrations {first} and {second} overlap")]
    OverlappingMigrations {
        /// Schema name
        schema: &'static str,
        /// First migration
        first: &'static str,
        /// Second migration
        second: &'static str,
    },

    /// A migration does not move the document forward
    #[error("schema '{schema}': {migration} does not advance past its input range")]
    NonProgressing {
        /// Schema name
        schema: &'static str,
        /// Migration name
        migration: &'static str,
    },

    /// Migration body rejected the document
    #[error("{migration} failed: {reason}")]
    MigrationFailed {
        /// Migration name
        migration: &'static str,
        /// Failure description
        reason: String,
    },

    /// Mapping to the typed model failed
    #[error("mapping failed: {0}")]
    Mapping(#[from] MapperError),
}

impl SchemaError {
    /// Create migration failure
    pub fn migration_failed(migration: &'static str, reason: impl Into<String>) -> Self {
        Self::MigrationFailed {
            migration,
            reason: reason.into(),
        }
    }
}
