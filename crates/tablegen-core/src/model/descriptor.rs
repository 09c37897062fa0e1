//! Compiled model descriptors.

use super::hooks::{HookPoint, HookSet};
use super::json_schema::ValidationSchema;
use crate::codec::Record;
use crate::error::Result;
use crate::relation::{ModelRef, RelationMap, ResolvedRelation};
use serde::Serialize;

/// Runtime-facing metadata of one table.
///
/// Built once per compilation and handed to the ORM runtime; the hook set is
/// carried as data and invoked through the lifecycle methods below.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    /// Application identifier.
    pub model_name: String,
    /// Storage identifier.
    pub table_name: String,
    /// Key columns.
    pub id_columns: Vec<String>,
    /// Validation schema.
    pub json_schema: ValidationSchema,
    /// Relations by name.
    pub relations: RelationMap,
    /// Attributes computed on read.
    pub virtual_attributes: Vec<String>,
    /// Attributes dropped before every write.
    pub omit_from_storage: Vec<String>,
    /// Decorators that contributed the hooks, in order.
    pub decorators: Vec<String>,
    /// Lifecycle hooks.
    #[serde(skip)]
    pub hooks: HookSet,
}

impl ModelDescriptor {
    /// Reference to this model.
    pub fn model_ref(&self) -> ModelRef {
        ModelRef::new(&self.model_name)
    }

    /// The key column, when the key is a single column.
    pub fn id_column(&self) -> Option<&str> {
        match self.id_columns.as_slice() {
            [column] => Some(column),
            _ => None,
        }
    }

    /// Get a relation by name.
    pub fn relation(&self, name: &str) -> Option<&ResolvedRelation> {
        self.relations.get(name)
    }

    /// Run the pre-update hooks.
    pub fn before_update(&self, record: &mut Record) -> Result<()> {
        Ok(self.hooks.run(HookPoint::BeforeUpdate, record)?)
    }

    /// Convert a row read from storage to its application form.
    pub fn parse_from_storage(&self, mut record: Record) -> Result<Record> {
        self.hooks.run(HookPoint::ParseFromStorage, &mut record)?;
        Ok(record)
    }

    /// Convert an application record to the payload written to storage.
    ///
    /// Omitted and virtual attributes are dropped before the hooks run.
    pub fn format_for_storage(&self, mut record: Record) -> Result<Record> {
        for attribute in self.omit_from_storage.iter().chain(&self.virtual_attributes) {
            record.remove(attribute);
        }
        self.hooks.run(HookPoint::FormatForStorage, &mut record)?;
        Ok(record)
    }
}
