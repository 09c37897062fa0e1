//! Model registry.
//!
//! Every table is registered under its model name before any relation is
//! resolved, so tables may reference each other in any order.

use crate::catalog::{SchemaSource, TableDef};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Identifier of a compiled model.
///
/// Relations hold these instead of the target descriptor; the target is looked
/// up on demand from the compiled schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ModelRef(String);

impl ModelRef {
    /// Create a model reference.
    pub fn new(model_name: impl Into<String>) -> Self {
        Self(model_name.into())
    }

    /// The model name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&TableDef> for ModelRef {
    fn from(table: &TableDef) -> Self {
        Self::new(&table.model_name)
    }
}

/// Tables indexed by model name and by table name.
#[derive(Debug, Default)]
pub struct ModelRegistry<'a> {
    by_model: HashMap<&'a str, &'a TableDef>,
    by_table: HashMap<&'a str, &'a TableDef>,
}

impl<'a> ModelRegistry<'a> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every table of a schema source.
    pub fn from_source(source: &'a SchemaSource) -> Self {
        let mut registry = Self::new();
        for table in source.tables() {
            registry.register(table);
        }
        registry
    }

    /// Register one table. Entries are written once.
    pub fn register(&mut self, table: &'a TableDef) -> ModelRef {
        self.by_model.entry(table.model_name.as_str()).or_insert(table);
        self.by_table.entry(table.name.as_str()).or_insert(table);
        ModelRef::from(table)
    }

    /// Look up a table by model reference.
    pub fn resolve(&self, model: &ModelRef) -> Option<&'a TableDef> {
        self.model(model.as_str())
    }

    /// Look up a table by model name.
    pub fn model(&self, model_name: &str) -> Option<&'a TableDef> {
        self.by_model.get(model_name).copied()
    }

    /// Look up a table by table name.
    pub fn table(&self, name: &str) -> Option<&'a TableDef> {
        self.by_table.get(name).copied()
    }

    /// Number of registered models.
    pub fn len(&self) -> usize {
        self.by_model.len()
    }

    /// Check if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.by_model.is_empty()
    }
}
