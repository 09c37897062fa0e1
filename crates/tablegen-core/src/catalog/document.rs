//! Input schema documents.
//!
//! These mirror the JSON accepted from schema authors. They are converted into
//! the catalog types once, validating kinds and target descriptions on the way.

use super::field::{
    DefaultValue, FieldConstraints, FieldDef, FieldTarget, ForeignKeyTarget, RelationTarget,
    ThroughTarget,
};
use super::relation::{ColumnRef, JoinDef, RelationDef, ThroughDef};
use super::table::{ForeignKeyDef, IndexDef, TableDef};
use super::types::{FieldKind, RelationKind};
use crate::error::SchemaError;
use serde::Deserialize;

/// Sentinel default value resolved to the storage engine's current timestamp.
pub const NOW_SENTINEL: &str = "now";

/// A complete project: tables plus standalone relations.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDocument {
    /// Table documents.
    pub tables: Vec<TableDocument>,
    /// Standalone relations.
    #[serde(default)]
    pub relations: Vec<RelationDocument>,
}

/// One table.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDocument {
    /// Storage name.
    pub name: String,
    /// Model name.
    pub model_name: String,
    /// Fields, in column order.
    #[serde(default)]
    pub fields: Vec<FieldDocument>,
    /// Additional indexes.
    #[serde(default)]
    pub indexes: Vec<IndexDocument>,
    /// Additional foreign keys.
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyDocument>,
    /// Skip the implicit key and timestamp columns.
    #[serde(default)]
    pub exclude_default_fields: bool,
    /// Name of a registered base descriptor.
    #[serde(default)]
    pub base_model: Option<String>,
}

/// A field's `type`: a kind name, or the legacy `[kind, "null"]` encoding.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TypeDocument {
    /// A kind name.
    Name(String),
    /// `[kind, "null"]`.
    Union(Vec<String>),
}

/// One field.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDocument {
    /// Field name.
    pub name: String,
    /// Declared kind.
    #[serde(rename = "type")]
    pub ty: TypeDocument,
    /// Allow null.
    #[serde(default)]
    pub nullable: bool,
    /// Default value; `"now"` is the current timestamp.
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    /// Lower bound for numbers.
    #[serde(default)]
    pub minimum: Option<f64>,
    /// Upper bound for numbers.
    #[serde(default)]
    pub maximum: Option<f64>,
    /// Maximum string length.
    #[serde(default)]
    pub max_length: Option<u32>,
    /// Allowed string values.
    #[serde(default, rename = "enum")]
    pub enum_values: Option<Vec<String>>,
    /// Add a single-column index.
    #[serde(default)]
    pub index: bool,
    /// Add a single-column unique index.
    #[serde(default)]
    pub unique: bool,
    /// Part of the primary key.
    #[serde(default)]
    pub primary: bool,
    /// Unsigned numeric column.
    #[serde(default)]
    pub unsigned: bool,
    /// Computed on the model, never stored.
    #[serde(default, rename = "virtual")]
    pub is_virtual: bool,
    /// Column comment and schema description.
    #[serde(default)]
    pub description: Option<String>,
    /// Schema title.
    #[serde(default)]
    pub title: Option<String>,
    /// External fragment of a `json` field.
    #[serde(default, rename = "ref")]
    pub reference: Option<String>,
    /// Target table of a `relation` or `fk` field.
    #[serde(default)]
    pub table: Option<String>,
    /// Owning-side join column.
    #[serde(default)]
    pub from: Option<String>,
    /// Target-side join column.
    #[serde(default)]
    pub to: Option<String>,
    /// Relation variant name.
    #[serde(default)]
    pub kind: Option<String>,
    /// Cascade deletes through the implied foreign key.
    #[serde(default)]
    pub cascade_on_delete: bool,
    /// Join table of a many-to-many relation.
    #[serde(default)]
    pub through: Option<ThroughDocument>,
}

/// Join table of a many-to-many relation field.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThroughDocument {
    /// Join table name.
    pub table: String,
    /// Join-table column referencing the owning side.
    pub from: String,
    /// Join-table column referencing the target side.
    pub to: String,
    /// Extra join-table columns exposed on the relation.
    #[serde(default)]
    pub extra: Vec<String>,
    /// Model of the join table, when not the table's own.
    #[serde(default)]
    pub model_name: Option<String>,
}

/// An index over one or more columns.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDocument {
    /// Indexed columns, in order.
    pub columns: Vec<String>,
    /// Unique index.
    #[serde(default)]
    pub unique: bool,
}

/// An explicit foreign key.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyDocument {
    /// Referencing column.
    pub from: String,
    /// Referenced table.
    pub table: String,
    /// Referenced column.
    pub to: String,
    /// Cascade deletes.
    #[serde(default)]
    pub cascade_on_delete: bool,
}

/// A standalone relation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationDocument {
    /// Relation name.
    pub name: String,
    /// Relation variant name.
    #[serde(rename = "type")]
    pub kind: String,
    /// Target model name.
    pub model_class: String,
    /// Join endpoints.
    pub join: JoinDocument,
    /// Delete action; `cascade` in any case enables cascading deletes.
    #[serde(default)]
    pub on_delete: Option<String>,
    /// Cascade deletes through the implied foreign key.
    #[serde(default)]
    pub cascade_on_delete: bool,
}

/// Join endpoints of a standalone relation.
#[derive(Debug, Clone, Deserialize)]
pub struct JoinDocument {
    /// Owning-side endpoint.
    pub from: ColumnDocument,
    /// Target-side endpoint.
    pub to: ColumnDocument,
    /// Join table of a many-to-many relation.
    #[serde(default)]
    pub through: Option<ThroughJoinDocument>,
}

/// A `table.column` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnDocument {
    /// Table name.
    pub table: String,
    /// Column name.
    pub column: String,
}

/// Join table of a standalone many-to-many relation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThroughJoinDocument {
    /// Join-table column referencing the owning side.
    pub from: ColumnDocument,
    /// Join-table column referencing the target side.
    pub to: ColumnDocument,
    /// Extra join-table columns exposed on the relation.
    #[serde(default)]
    pub extra: Vec<String>,
    /// Model of the join table.
    pub model_class: String,
}

impl TableDocument {
    /// Convert into a table definition.
    pub fn into_table(self) -> Result<TableDef, SchemaError> {
        let table_name = self.name;
        let fields = self
            .fields
            .into_iter()
            .map(|field| field.into_field(&table_name))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TableDef {
            name: table_name,
            model_name: self.model_name,
            fields,
            indexes: self
                .indexes
                .into_iter()
                .map(|index| IndexDef {
                    columns: index.columns,
                    unique: index.unique,
                })
                .collect(),
            foreign_keys: self
                .foreign_keys
                .into_iter()
                .map(|fk| ForeignKeyDef {
                    from: fk.from,
                    table: fk.table,
                    to: fk.to,
                    cascade_on_delete: fk.cascade_on_delete,
                })
                .collect(),
            exclude_default_fields: self.exclude_default_fields,
            base_model: self.base_model,
        })
    }
}

impl TypeDocument {
    /// Resolve to a kind plus whether the encoding itself implies nullability.
    fn resolve(&self, table: &str, field: &str) -> Result<(FieldKind, bool), SchemaError> {
        let (name, nullable) = match self {
            TypeDocument::Name(name) => (name.as_str(), false),
            TypeDocument::Union(types) => {
                let non_null: Vec<&String> = types.iter().filter(|t| *t != "null").collect();
                match non_null.as_slice() {
                    [name] if types.len() == 2 => (name.as_str(), true),
                    _ => {
                        return Err(SchemaError::MalformedNullableType {
                            table: table.to_string(),
                            field: field.to_string(),
                            encoding: types.clone(),
                        })
                    }
                }
            }
        };

        let kind = name
            .parse::<FieldKind>()
            .map_err(|kind| SchemaError::UnknownFieldKind {
                table: table.to_string(),
                field: field.to_string(),
                kind,
            })?;
        Ok((kind, nullable))
    }
}

impl FieldDocument {
    /// Convert into a field definition owned by `table`.
    pub fn into_field(self, table: &str) -> Result<FieldDef, SchemaError> {
        let (kind, nullable_type) = self.ty.resolve(table, &self.name)?;

        let target = match kind {
            FieldKind::Relation => Some(FieldTarget::Relation(self.relation_target(table)?)),
            FieldKind::Fk => Some(FieldTarget::ForeignKey(self.foreign_key_target(table)?)),
            _ => None,
        };

        let default = self.default.map(|value| match value.as_str() {
            Some(NOW_SENTINEL) => DefaultValue::Now,
            _ => DefaultValue::Literal(value),
        });

        Ok(FieldDef {
            name: self.name,
            kind,
            nullable: self.nullable || nullable_type,
            constraints: FieldConstraints {
                minimum: self.minimum,
                maximum: self.maximum,
                max_length: self.max_length,
                enum_values: self.enum_values,
                unsigned: self.unsigned,
            },
            default,
            index: self.index,
            unique: self.unique,
            primary: self.primary,
            is_virtual: self.is_virtual,
            description: self.description,
            title: self.title,
            fragment: self.reference,
            target,
        })
    }

    fn missing(&self, table: &str, what: &'static str) -> SchemaError {
        SchemaError::MissingTarget {
            table: table.to_string(),
            field: self.name.clone(),
            what,
        }
    }

    fn relation_target(&self, table: &str) -> Result<RelationTarget, SchemaError> {
        let target_table = self
            .table
            .clone()
            .ok_or_else(|| self.missing(table, "target table"))?;
        let kind_name = self
            .kind
            .as_deref()
            .ok_or_else(|| self.missing(table, "relation kind"))?;
        let kind = kind_name
            .parse::<RelationKind>()
            .map_err(|kind| SchemaError::UnknownRelationKind {
                table: table.to_string(),
                relation: self.name.clone(),
                kind,
            })?;

        Ok(RelationTarget {
            table: target_table,
            from: self.from.clone(),
            to: self.to.clone(),
            kind,
            cascade_on_delete: self.cascade_on_delete,
            through: self.through.clone().map(|through| ThroughTarget {
                table: through.table,
                from: through.from,
                to: through.to,
                extra: through.extra,
                model_name: through.model_name,
            }),
        })
    }

    fn foreign_key_target(&self, table: &str) -> Result<ForeignKeyTarget, SchemaError> {
        Ok(ForeignKeyTarget {
            table: self
                .table
                .clone()
                .ok_or_else(|| self.missing(table, "referenced table"))?,
            to: self
                .to
                .clone()
                .ok_or_else(|| self.missing(table, "referenced column"))?,
            cascade_on_delete: self.cascade_on_delete,
        })
    }
}

impl RelationDocument {
    /// Convert into a relation definition.
    pub fn into_relation(self) -> Result<RelationDef, SchemaError> {
        let kind = self
            .kind
            .parse::<RelationKind>()
            .map_err(|kind| SchemaError::UnknownRelationKind {
                table: self.join.from.table.clone(),
                relation: self.name.clone(),
                kind,
            })?;

        let cascade_on_delete = self.cascade_on_delete
            || self
                .on_delete
                .as_deref()
                .is_some_and(|action| action.eq_ignore_ascii_case("cascade"));

        Ok(RelationDef {
            name: self.name,
            kind,
            model_name: self.model_class,
            join: JoinDef {
                from: self.join.from.into(),
                to: self.join.to.into(),
                through: self.join.through.map(|through| ThroughDef {
                    from: through.from.into(),
                    to: through.to.into(),
                    extra: through.extra,
                    model_name: through.model_class,
                }),
            },
            cascade_on_delete,
        })
    }
}

impl From<ColumnDocument> for ColumnRef {
    fn from(doc: ColumnDocument) -> Self {
        ColumnRef::new(doc.table, doc.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(value: serde_json::Value) -> Result<FieldDef, SchemaError> {
        serde_json::from_value::<FieldDocument>(value)
            .unwrap()
            .into_field("person")
    }

    #[test]
    fn test_plain_field() {
        let f = field(json!({
            "name": "firstName",
            "type": "string",
            "maxLength": 50,
            "index": true,
            "description": "Given name"
        }))
        .unwrap();

        assert_eq!(f.kind, FieldKind::String);
        assert_eq!(f.constraints.max_length, Some(50));
        assert!(f.index);
        assert!(!f.nullable);
        assert_eq!(f.description.as_deref(), Some("Given name"));
    }

    #[test]
    fn test_now_default_is_sentinel() {
        let f = field(json!({ "name": "seenAt", "type": "datetime", "default": "now" })).unwrap();
        assert_eq!(f.default, Some(DefaultValue::Now));

        let f = field(json!({ "name": "age", "type": "integer", "default": 18 })).unwrap();
        assert_eq!(f.default, Some(DefaultValue::Literal(json!(18))));
    }

    #[test]
    fn test_legacy_nullable_encoding() {
        let f = field(json!({ "name": "dob", "type": ["date", "null"] })).unwrap();
        assert_eq!(f.kind, FieldKind::Date);
        assert!(f.nullable);

        let err = field(json!({ "name": "dob", "type": ["date", "string"] })).unwrap_err();
        assert!(matches!(err, SchemaError::MalformedNullableType { .. }));

        let err = field(json!({ "name": "dob", "type": ["date"] })).unwrap_err();
        assert!(matches!(err, SchemaError::MalformedNullableType { .. }));
    }

    #[test]
    fn test_unknown_kind_is_named() {
        let err = field(json!({ "name": "ssn", "type": "uuid" })).unwrap_err();
        match err {
            SchemaError::UnknownFieldKind { table, field, kind } => {
                assert_eq!(table, "person");
                assert_eq!(field, "ssn");
                assert_eq!(kind, "uuid");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_fk_field_requires_target() {
        let f = field(json!({
            "name": "ownerId",
            "type": "fk",
            "table": "person",
            "to": "id",
            "cascadeOnDelete": true
        }))
        .unwrap();
        let target = f.foreign_key_target().unwrap();
        assert_eq!(target.table, "person");
        assert!(target.cascade_on_delete);

        let err = field(json!({ "name": "ownerId", "type": "fk", "table": "person" })).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::MissingTarget { what: "referenced column", .. }
        ));
    }

    #[test]
    fn test_relation_field() {
        let f = field(json!({
            "name": "movies",
            "type": "relation",
            "kind": "ManyToMany",
            "table": "movie",
            "through": {
                "table": "review",
                "from": "criticId",
                "to": "movieId",
                "extra": ["rating"]
            }
        }))
        .unwrap();
        let target = f.relation_target().unwrap();
        assert_eq!(target.kind, RelationKind::ManyToMany);
        assert_eq!(target.through.as_ref().unwrap().extra, vec!["rating"]);

        let err = field(json!({ "name": "x", "type": "relation", "kind": "HasSome", "table": "t" }))
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownRelationKind { .. }));
    }

    #[test]
    fn test_standalone_relation_on_delete() {
        let doc: RelationDocument = serde_json::from_value(json!({
            "name": "owner",
            "type": "BelongsToOne",
            "modelClass": "Person",
            "join": {
                "from": { "table": "pet", "column": "ownerId" },
                "to": { "table": "person", "column": "id" }
            },
            "onDelete": "CASCADE"
        }))
        .unwrap();

        let relation = doc.into_relation().unwrap();
        assert_eq!(relation.kind, RelationKind::BelongsToOne);
        assert!(relation.cascade_on_delete);
        assert_eq!(relation.join.from, ColumnRef::new("pet", "ownerId"));
    }
}
