//! Field definitions for tables.

use super::types::{FieldKind, RelationKind};

/// A field definition within a table.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// Field name (column name for stored fields).
    pub name: String,
    /// Declared kind.
    pub kind: FieldKind,
    /// Whether the column accepts null.
    pub nullable: bool,
    /// Value constraints.
    pub constraints: FieldConstraints,
    /// Default value if not provided.
    pub default: Option<DefaultValue>,
    /// Whether this field should be indexed.
    pub index: bool,
    /// Whether this field must be unique.
    pub unique: bool,
    /// Whether this field is (part of) the primary key.
    pub primary: bool,
    /// Computed on read, never persisted.
    pub is_virtual: bool,
    /// Column comment.
    pub description: Option<String>,
    /// Display title.
    pub title: Option<String>,
    /// External schema fragment describing a `json` field.
    pub fragment: Option<String>,
    /// Target of a `relation` or `fk` field.
    pub target: Option<FieldTarget>,
}

/// Value constraints attached to a field.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldConstraints {
    /// Inclusive lower bound.
    pub minimum: Option<f64>,
    /// Inclusive upper bound.
    pub maximum: Option<f64>,
    /// Maximum string length.
    pub max_length: Option<u32>,
    /// Enumerated values.
    pub enum_values: Option<Vec<String>>,
    /// Explicitly unsigned.
    pub unsigned: bool,
}

/// Default value for a field.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// The storage engine's current timestamp.
    Now,
    /// A literal value.
    Literal(serde_json::Value),
}

/// What a `relation` or `fk` field points at.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldTarget {
    /// A named association.
    Relation(RelationTarget),
    /// A physical foreign key.
    ForeignKey(ForeignKeyTarget),
}

/// Target of a `relation` field.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationTarget {
    /// Target table name.
    pub table: String,
    /// Column on the owning table; defaults to its key column.
    pub from: Option<String>,
    /// Column on the target table; defaults to its key column.
    pub to: Option<String>,
    /// Relation variant.
    pub kind: RelationKind,
    /// Cascade deletes through the implied foreign key.
    pub cascade_on_delete: bool,
    /// Join table for many-to-many relations.
    pub through: Option<ThroughTarget>,
}

/// Join table of a many-to-many relation field.
#[derive(Debug, Clone, PartialEq)]
pub struct ThroughTarget {
    /// Join table name.
    pub table: String,
    /// Join-table column referencing the owning table.
    pub from: String,
    /// Join-table column referencing the target table.
    pub to: String,
    /// Extra join-table columns exposed on the relation.
    pub extra: Vec<String>,
    /// Model name of the join table, when it differs from its table's model.
    pub model_name: Option<String>,
}

/// Target of an `fk` field.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyTarget {
    /// Referenced table name.
    pub table: String,
    /// Referenced column.
    pub to: String,
    /// Cascade deletes from the referenced row.
    pub cascade_on_delete: bool,
}

impl FieldDef {
    /// Create a new non-nullable field.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
            constraints: FieldConstraints::default(),
            default: None,
            index: false,
            unique: false,
            primary: false,
            is_virtual: false,
            description: None,
            title: None,
            fragment: None,
            target: None,
        }
    }

    /// Create an auto-incrementing key field.
    pub fn id(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Id)
    }

    /// Create an `fk` field referencing `table.to`.
    pub fn foreign_key(
        name: impl Into<String>,
        table: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        let mut field = Self::new(name, FieldKind::Fk);
        field.target = Some(FieldTarget::ForeignKey(ForeignKeyTarget {
            table: table.into(),
            to: to.into(),
            cascade_on_delete: false,
        }));
        field
    }

    /// Create a `relation` field.
    pub fn relation(name: impl Into<String>, kind: RelationKind, table: impl Into<String>) -> Self {
        let mut field = Self::new(name, FieldKind::Relation);
        field.target = Some(FieldTarget::Relation(RelationTarget {
            table: table.into(),
            from: None,
            to: None,
            kind,
            cascade_on_delete: false,
            through: None,
        }));
        field
    }

    /// Mark as nullable.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Mark as primary key member.
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    /// Mark as indexed.
    pub fn with_index(mut self) -> Self {
        self.index = true;
        self
    }

    /// Mark as unique.
    pub fn with_unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Mark as virtual.
    pub fn computed(mut self) -> Self {
        self.is_virtual = true;
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Set the maximum length.
    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.constraints.max_length = Some(max_length);
        self
    }

    /// Set the inclusive lower bound.
    pub fn with_minimum(mut self, minimum: f64) -> Self {
        self.constraints.minimum = Some(minimum);
        self
    }

    /// Set the enumerated values.
    pub fn with_enum(mut self, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.constraints.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Set the column comment.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the external fragment reference.
    pub fn with_fragment(mut self, reference: impl Into<String>) -> Self {
        self.fragment = Some(reference.into());
        self
    }

    /// Set the owning and target join columns of a relation field.
    pub fn with_join(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        if let Some(FieldTarget::Relation(target)) = &mut self.target {
            target.from = Some(from.into());
            target.to = Some(to.into());
        }
        self
    }

    /// Set the join table of a many-to-many relation field.
    pub fn with_through(mut self, through: ThroughTarget) -> Self {
        if let Some(FieldTarget::Relation(target)) = &mut self.target {
            target.through = Some(through);
        }
        self
    }

    /// Opt into cascading deletes.
    pub fn cascade_on_delete(mut self) -> Self {
        match &mut self.target {
            Some(FieldTarget::Relation(target)) => target.cascade_on_delete = true,
            Some(FieldTarget::ForeignKey(target)) => target.cascade_on_delete = true,
            None => {}
        }
        self
    }

    /// Check if this field is a primary key member.
    pub fn is_primary(&self) -> bool {
        self.primary || self.kind == FieldKind::Id
    }

    /// Check if this field is backed by a column.
    pub fn is_stored(&self) -> bool {
        self.kind != FieldKind::Relation && !self.is_virtual
    }

    /// The relation target, if this is a relation field.
    pub fn relation_target(&self) -> Option<&RelationTarget> {
        match &self.target {
            Some(FieldTarget::Relation(target)) => Some(target),
            _ => None,
        }
    }

    /// The foreign key target, if this is an `fk` field.
    pub fn foreign_key_target(&self) -> Option<&ForeignKeyTarget> {
        match &self.target {
            Some(FieldTarget::ForeignKey(target)) => Some(target),
            _ => None,
        }
    }
}

impl ThroughTarget {
    /// Create a join table description.
    pub fn new(table: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            from: from.into(),
            to: to.into(),
            extra: Vec::new(),
            model_name: None,
        }
    }

    /// Set the extra columns carried by the join table.
    pub fn with_extra(mut self, extra: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extra = extra.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_def_builder() {
        let field = FieldDef::new("name", FieldKind::String)
            .with_max_length(80)
            .with_index()
            .with_description("Display name");

        assert_eq!(field.name, "name");
        assert!(!field.nullable);
        assert!(field.index);
        assert_eq!(field.constraints.max_length, Some(80));
        assert!(field.is_stored());
        assert!(!field.is_primary());
    }

    #[test]
    fn test_id_field_is_primary() {
        assert!(FieldDef::id("id").is_primary());
        assert!(FieldDef::new("code", FieldKind::String).primary().is_primary());
    }

    #[test]
    fn test_relation_and_virtual_fields_are_not_stored() {
        let pets =
            FieldDef::relation("pets", RelationKind::HasMany, "pet").with_join("id", "ownerId");
        let full_name = FieldDef::new("fullName", FieldKind::String).computed();

        assert!(!pets.is_stored());
        assert!(!full_name.is_stored());

        let target = pets.relation_target().unwrap();
        assert_eq!(target.from.as_deref(), Some("id"));
        assert_eq!(target.to.as_deref(), Some("ownerId"));
    }

    #[test]
    fn test_foreign_key_cascade() {
        let field = FieldDef::foreign_key("customerId", "customer", "id").cascade_on_delete();
        let target = field.foreign_key_target().unwrap();

        assert_eq!(target.table, "customer");
        assert!(target.cascade_on_delete);
        assert!(field.relation_target().is_none());
    }
}
