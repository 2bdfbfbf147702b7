//! Solo Schema Engine
//!
//! Versioned data models with forward-only migration chains.
//!
//! # Core Concepts
//!
//! - [`SchemaVersion`]: integer tag stored as `schemaVersion` in every document
//! - [`VersionRange`]: half-open window of versions a migration accepts
//! - [`SchemaMigration`]: one N → N+1 link; validates input, works on a copy
//! - [`Schema`]: current version + verified chain; `transform` lifts any
//!   older document and maps it to the typed model
//!
//! # Example
//!
//! ```rust,ignore
//! let schema: Schema<LocalConfig> = Schema::builder("LocalConfig", SchemaVersion::new(2))
//!     .migration(LocalConfigV1Migration)
//!     .migration(LocalConfigV2Migration)
//!     .build()?;
//!
//! let config = schema.transform(&plain)?;
//! ```

#![warn(unreachable_pub)]

mod error;
mod migration;
mod schema;
mod version;

pub use error::SchemaError;
pub use migration::{object_field, rename_field, SchemaMigration};
pub use schema::{Migrated, Schema, SchemaBuilder};
pub use version::{SchemaVersion, VersionRange, SCHEMA_VERSION_KEY};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
