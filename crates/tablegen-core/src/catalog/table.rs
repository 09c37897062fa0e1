//! Table definitions.

use super::field::FieldDef;
use super::types::FieldKind;
use crate::config::CompilerConfig;

/// A table definition.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDef {
    /// Storage identifier (unique within the project).
    pub name: String,
    /// Application identifier (unique within the project).
    pub model_name: String,
    /// Field definitions, in declaration order.
    pub fields: Vec<FieldDef>,
    /// Declared indexes.
    pub indexes: Vec<IndexDef>,
    /// Explicit foreign keys.
    pub foreign_keys: Vec<ForeignKeyDef>,
    /// Suppress the default update/create timestamp columns.
    pub exclude_default_fields: bool,
    /// Name of a registered base-descriptor override.
    pub base_model: Option<String>,
}

/// A declared index over one or more columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDef {
    /// Indexed columns, in order.
    pub columns: Vec<String>,
    /// Unique index.
    pub unique: bool,
}

/// An explicit foreign key entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyDef {
    /// Local column.
    pub from: String,
    /// Referenced table.
    pub table: String,
    /// Referenced column.
    pub to: String,
    /// Cascade deletes from the referenced row.
    pub cascade_on_delete: bool,
}

impl TableDef {
    /// Create a new table definition.
    pub fn new(name: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model_name: model_name.into(),
            fields: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            exclude_default_fields: false,
            base_model: None,
        }
    }

    /// Add a field to the table.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Add multiple fields.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldDef>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Add an index.
    pub fn with_index(mut self, index: IndexDef) -> Self {
        self.indexes.push(index);
        self
    }

    /// Add an explicit foreign key.
    pub fn with_foreign_key(mut self, foreign_key: ForeignKeyDef) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    /// Suppress the default timestamp columns.
    pub fn without_default_fields(mut self) -> Self {
        self.exclude_default_fields = true;
        self
    }

    /// Use a named base-descriptor override.
    pub fn with_base_model(mut self, name: impl Into<String>) -> Self {
        self.base_model = Some(name.into());
        self
    }

    /// Get a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields backed by a column.
    pub fn stored_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.is_stored())
    }

    /// Primary key members among the stored fields.
    pub fn primary_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.stored_fields().filter(|f| f.is_primary())
    }

    /// Names of virtual fields.
    pub fn virtual_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.is_virtual)
    }

    /// `relation` fields.
    pub fn relation_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.kind == FieldKind::Relation)
    }

    /// `fk` fields.
    pub fn foreign_key_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.stored_fields().filter(|f| f.kind == FieldKind::Fk)
    }

    /// Whether any field is marked primary. Without one, the legacy implicit
    /// key column is generated.
    pub fn has_explicit_primary(&self) -> bool {
        self.primary_fields().next().is_some()
    }

    /// Whether the default timestamp columns are generated.
    pub fn has_default_fields(&self) -> bool {
        !self.exclude_default_fields
    }

    /// Key column names: the primary fields, or the implicit key column.
    pub fn key_columns(&self, config: &CompilerConfig) -> Vec<String> {
        let primary: Vec<String> = self.primary_fields().map(|f| f.name.clone()).collect();
        if primary.is_empty() {
            vec![config.key_column.clone()]
        } else {
            primary
        }
    }

    /// Every physical column of the table once created.
    pub fn column_names(&self, config: &CompilerConfig) -> Vec<String> {
        let mut columns = Vec::new();
        if !self.has_explicit_primary() {
            columns.push(config.key_column.clone());
        }
        columns.extend(self.stored_fields().map(|f| f.name.clone()));
        if self.has_default_fields() {
            columns.push(config.timestamps.updated.clone());
            columns.push(config.timestamps.created.clone());
        }
        columns
    }

    /// Check whether the table will have a column with this name.
    pub fn has_column(&self, name: &str, config: &CompilerConfig) -> bool {
        self.column_names(config).iter().any(|c| c == name)
    }
}

impl IndexDef {
    /// Create a non-unique index.
    pub fn new(columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
        }
    }

    /// Create a unique index.
    pub fn unique(columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            unique: true,
            ..Self::new(columns)
        }
    }
}

impl ForeignKeyDef {
    /// Create a foreign key entry.
    pub fn new(from: impl Into<String>, table: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            table: table.into(),
            to: to.into(),
            cascade_on_delete: false,
        }
    }

    /// Opt into cascading deletes.
    pub fn cascade_on_delete(mut self) -> Self {
        self.cascade_on_delete = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RelationKind;

    fn person() -> TableDef {
        TableDef::new("person", "Person")
            .with_field(FieldDef::new("firstName", FieldKind::String))
            .with_field(FieldDef::new("age", FieldKind::Integer).nullable())
            .with_field(FieldDef::new("fullName", FieldKind::String).computed())
            .with_field(FieldDef::relation("pets", RelationKind::HasMany, "pet"))
    }

    #[test]
    fn test_table_builder() {
        let table = person().with_index(IndexDef::unique(["firstName"]));

        assert_eq!(table.name, "person");
        assert_eq!(table.model_name, "Person");
        assert_eq!(table.fields.len(), 4);
        assert_eq!(table.stored_fields().count(), 2);
        assert_eq!(table.virtual_fields().count(), 1);
        assert_eq!(table.relation_fields().count(), 1);
        assert!(table.indexes[0].unique);
    }

    #[test]
    fn test_implicit_key_columns() {
        let config = CompilerConfig::default();
        let table = person();

        assert!(!table.has_explicit_primary());
        assert_eq!(table.key_columns(&config), vec!["id".to_string()]);
        assert_eq!(
            table.column_names(&config),
            vec!["id", "firstName", "age", "updated_at", "created_at"]
        );
        assert!(!table.has_column("pets", &config));
        assert!(!table.has_column("fullName", &config));
    }

    #[test]
    fn test_explicit_composite_key_columns() {
        let config = CompilerConfig::default();
        let table = TableDef::new("review", "Review")
            .with_field(FieldDef::new("criticId", FieldKind::Integer).primary())
            .with_field(FieldDef::new("movieId", FieldKind::Integer).primary())
            .without_default_fields();

        assert_eq!(table.key_columns(&config), vec!["criticId", "movieId"]);
        assert_eq!(table.column_names(&config), vec!["criticId", "movieId"]);
    }
}
