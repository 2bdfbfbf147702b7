//! Versioned schemas
//!
//! A [`Schema`] ties a typed model to its current version and the chain of
//! migrations that lift older documents up to it.

use std::fmt;
use std::marker::PhantomData;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use solo_mapper::{from_object, to_object};

use crate::error::SchemaError;
use crate::migration::SchemaMigration;
use crate::version::{SchemaVersion, SCHEMA_VERSION_KEY};

/// Result of lifting a document to the current version
#[derive(Debug, Clone, PartialEq)]
pub struct Migrated {
    /// Document at the current version
    pub value: Value,
    /// Version the document declared on input
    pub from: SchemaVersion,
    /// Names of the migrations applied, in order
    pub applied: Vec<&'static str>,
}

impl Migrated {
    /// Check if any migration ran
    #[inline]
    #[must_use]
    pub fn is_migrated(&self) -> bool {
        !self.applied.is_empty()
    }
}

/// Versioned schema for model `T`
pub struct Schema<T> {
    name: &'static str,
    version: SchemaVersion,
    migrations: Vec<Box<dyn SchemaMigration>>,
    _model: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("migrations", &self.migrations)
            .finish()
    }
}

impl<T> Schema<T> {
    /// Start building a schema
    #[inline]
    #[must_use]
    pub fn builder(name: &'static str, version: SchemaVersion) -> SchemaBuilder<T> {
        SchemaBuilder {
            name,
            version,
            migrations: Vec::new(),
            _model: PhantomData,
        }
    }

    /// Schema name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Current version
    #[inline]
    #[must_use]
    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    /// Migrations in ascending range order
    #[inline]
    #[must_use]
    pub fn migrations(&self) -> &[Box<dyn SchemaMigration>] {
        &self.migrations
    }

    /// Check chain completeness
    ///
    /// Every migration must advance past its range, stay at or below the
    /// current version, and produce a version that is either current or
    /// accepted by exactly one other migration. No two ranges may overlap.
    ///
    /// # Errors
    /// Returns the first defect found
    pub fn verify_chain(&self) -> Result<(), SchemaError> {
        for pair in self.migrations.windows(2) {
            if pair[0].range().overlaps(&pair[1].range()) {
                return Err(SchemaError::OverlappingMigrations {
                    schema: self.name,
                    first: pair[0].name(),
                    second: pair[1].name(),
                });
            }
        }

        for migration in &self.migrations {
            let target = migration.version();
            if target < migration.range().max() || target > self.version {
                return Err(SchemaError::NonProgressing {
                    schema: self.name,
                    migration: migration.name(),
                });
            }
            if target != self.version && self.find(target).is_none() {
                return Err(SchemaError::BrokenChain {
                    schema: self.name,
                    migration: migration.name(),
                    version: target,
                });
            }
        }

        Ok(())
    }

    fn find(&self, version: SchemaVersion) -> Option<&dyn SchemaMigration> {
        self.migrations
            .iter()
            .find(|m| m.range().contains(version))
            .map(|m| m.as_ref())
    }

    /// Lift a plain document to the current version
    ///
    /// Documents already at the current version are returned unchanged.
    ///
    /// # Errors
    /// - `ForwardIncompatible` if the document is newer than this schema
    /// - `MissingMigration` if some intermediate version has no migration
    /// - any error a migration step reports
    pub fn migrate_value(&self, document: &Value) -> Result<Migrated, SchemaError> {
        let from = SchemaVersion::read(document)?;
        if from > self.version {
            return Err(SchemaError::ForwardIncompatible {
                schema: self.name,
                version: from,
                current: self.version,
            });
        }

        let mut value = document.clone();
        let mut version = from;
        let mut applied = Vec::new();

        while version < self.version {
            let migration = self.find(version).ok_or_else(|| SchemaError::MissingMigration {
                schema: self.name,
                version,
                current: self.version,
            })?;

            tracing::debug!(
                schema = self.name,
                migration = migration.name(),
                from = %version,
                to = %migration.version(),
                "applying schema migration"
            );
            value = migration.migrate(&value)?;

            let next = SchemaVersion::read(&value)?;
            if next <= version {
                return Err(SchemaError::NonProgressing {
                    schema: self.name,
                    migration: migration.name(),
                });
            }
            version = next;
            applied.push(migration.name());
        }

        Ok(Migrated {
            value,
            from,
            applied,
        })
    }
}

impl<T: DeserializeOwned> Schema<T> {
    /// Lift a plain document to the current version and map it to `T`
    ///
    /// # Errors
    /// Returns any migration or mapping error
    pub fn transform(&self, document: &Value) -> Result<T, SchemaError> {
        self.transform_with_report(document).map(|(model, _)| model)
    }

    /// Like [`transform`](Self::transform), also reporting what ran
    ///
    /// # Errors
    /// Returns any migration or mapping error
    pub fn transform_with_report(&self, document: &Value) -> Result<(T, Migrated), SchemaError> {
        let migrated = self.migrate_value(document)?;
        let model = from_object(migrated.value.clone())?;
        Ok((model, migrated))
    }
}

impl<T: Serialize> Schema<T> {
    /// Map a model to a plain document stamped with the current version
    ///
    /// # Errors
    /// Returns error if the model does not serialize to an object
    pub fn encode(&self, model: &T) -> Result<Value, SchemaError> {
        let mut value = to_object(model)?;
        let body = value.as_object_mut().ok_or(SchemaError::NotAnObject)?;
        body.insert(SCHEMA_VERSION_KEY.to_string(), self.version.into());
        Ok(value)
    }
}

/// Builder for [`Schema`]
pub struct SchemaBuilder<T> {
    name: &'static str,
    version: SchemaVersion,
    migrations: Vec<Box<dyn SchemaMigration>>,
    _model: PhantomData<fn() -> T>,
}

impl<T> SchemaBuilder<T> {
    /// Add a migration step
    #[must_use]
    pub fn migration(mut self, migration: impl SchemaMigration + 'static) -> Self {
        self.migrations.push(Box::new(migration));
        self
    }

    /// Sort the chain and verify it
    ///
    /// # Errors
    /// Returns error if the chain is incomplete or overlapping
    pub fn build(mut self) -> Result<Schema<T>, SchemaError> {
        self.migrations.sort_by_key(|m| m.range().min());
        let schema = Schema {
            name: self.name,
            version: self.version,
            migrations: self.migrations,
            _model: PhantomData,
        };
        schema.verify_chain()?;
        Ok(schema)
    }
}
