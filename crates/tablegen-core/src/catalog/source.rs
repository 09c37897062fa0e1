//! Schema source - the validated set of table and relation definitions.

use super::document::ProjectDocument;
use super::{FieldKind, RelationDef, TableDef};
use crate::error::{Error, SchemaError};
use std::collections::HashSet;

/// Every table and standalone relation of one compilation run.
///
/// Built once from the schema source and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaSource {
    tables: Vec<TableDef>,
    relations: Vec<RelationDef>,
}

impl SchemaSource {
    /// Validate and assemble a schema source.
    ///
    /// Table names, model names, and field names within a table must be unique.
    pub fn new(tables: Vec<TableDef>, relations: Vec<RelationDef>) -> Result<Self, SchemaError> {
        let mut table_names = HashSet::new();
        let mut model_names = HashSet::new();

        for table in &tables {
            if !table_names.insert(table.name.as_str()) {
                return Err(SchemaError::DuplicateTable {
                    table: table.name.clone(),
                });
            }
            if !model_names.insert(table.model_name.as_str()) {
                return Err(SchemaError::DuplicateModel {
                    table: table.name.clone(),
                    model: table.model_name.clone(),
                });
            }

            let mut field_names = HashSet::new();
            for field in &table.fields {
                if !field_names.insert(field.name.as_str()) {
                    return Err(SchemaError::DuplicateField {
                        table: table.name.clone(),
                        field: field.name.clone(),
                    });
                }
            }
        }

        Ok(Self { tables, relations })
    }

    /// Build from a parsed project document.
    pub fn from_document(document: ProjectDocument) -> Result<Self, Error> {
        let tables = document
            .tables
            .into_iter()
            .map(|table| table.into_table())
            .collect::<Result<Vec<_>, _>>()?;
        let relations = document
            .relations
            .into_iter()
            .map(|relation| relation.into_relation())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(tables, relations)?)
    }

    /// Parse a project document from JSON text.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let document: ProjectDocument = serde_json::from_str(json)?;
        Self::from_document(document)
    }

    /// All tables, in declaration order.
    pub fn tables(&self) -> &[TableDef] {
        &self.tables
    }

    /// All standalone relations, in declaration order.
    pub fn relations(&self) -> &[RelationDef] {
        &self.relations
    }

    /// Get a table by storage name.
    pub fn get_table(&self, name: &str) -> Option<&TableDef> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Distinct external fragment references of stored `json` fields.
    pub fn fragment_refs(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.tables
            .iter()
            .flat_map(|t| t.stored_fields())
            .filter(|f| f.kind == FieldKind::Json)
            .filter_map(|f| f.fragment.as_deref())
            .filter(|reference| seen.insert(*reference))
            .collect()
    }
}
