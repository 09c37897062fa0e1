//! Field type resolution.
//!
//! Maps a field's declared kind and constraints to a concrete column type
//! plus an ordered modifier chain. `fk` fields borrow the type of the column
//! they reference.

use crate::catalog::{
    DefaultValue, FieldConstraints, FieldDef, FieldKind, SchemaSource, TableDef,
};
use crate::config::CompilerConfig;
use crate::error::SchemaError;
use serde::Serialize;
use std::collections::HashSet;

/// Longest `string` column before falling back to `text`.
pub const MAX_STRING_LENGTH: u32 = 255;

/// Physical column type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ColumnType {
    /// Auto-incrementing integer.
    Increments,
    /// Integer.
    Integer,
    /// Bounded string.
    String {
        /// Maximum length.
        length: u32,
    },
    /// Unbounded text.
    Text,
    /// Enumerated string.
    Enum {
        /// Allowed values.
        values: Vec<String>,
    },
    /// Floating point.
    Float,
    /// Boolean.
    Boolean,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Date and time.
    DateTime,
    /// Structured document.
    Json,
}

impl ColumnType {
    /// Table-builder constructor name.
    pub fn constructor(&self) -> &'static str {
        match self {
            ColumnType::Increments => "increments",
            ColumnType::Integer => "integer",
            ColumnType::String { .. } => "string",
            ColumnType::Text => "text",
            ColumnType::Enum { .. } => "enu",
            ColumnType::Float => "float",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::Time => "time",
            ColumnType::DateTime => "datetime",
            ColumnType::Json => "json",
        }
    }

    /// Constructor arguments following the column name.
    pub fn constructor_args(&self) -> Vec<serde_json::Value> {
        match self {
            ColumnType::String { length } => vec![serde_json::Value::from(*length)],
            ColumnType::Enum { values } => vec![serde_json::Value::from(values.clone())],
            _ => Vec::new(),
        }
    }
}

/// Default value expression of a column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DefaultExpr {
    /// The engine's current timestamp function.
    Now,
    /// A literal value.
    Literal(serde_json::Value),
}

impl From<&DefaultValue> for DefaultExpr {
    fn from(value: &DefaultValue) -> Self {
        match value {
            DefaultValue::Now => DefaultExpr::Now,
            DefaultValue::Literal(v) => DefaultExpr::Literal(v.clone()),
        }
    }
}

/// A chained column modifier.
///
/// Modifiers are kept in table-builder chaining order: unsigned, primary,
/// default, nullability, index, unique, comment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnModifier {
    /// Unsigned integer.
    Unsigned,
    /// Single-column primary key.
    Primary,
    /// Default value.
    Default(DefaultExpr),
    /// Accepts null.
    Nullable,
    /// Rejects null.
    NotNullable,
    /// Indexed.
    Index,
    /// Unique.
    Unique,
    /// Column comment.
    Comment(String),
}

/// A fully resolved column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Column type.
    #[serde(flatten)]
    pub column_type: ColumnType,
    /// Ordered modifiers.
    pub modifiers: Vec<ColumnModifier>,
}

impl ColumnDef {
    /// Create a column with no modifiers.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            modifiers: Vec::new(),
        }
    }

    /// Append a modifier.
    pub fn with_modifier(mut self, modifier: ColumnModifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    /// Check for a modifier.
    pub fn has(&self, modifier: &ColumnModifier) -> bool {
        self.modifiers.contains(modifier)
    }

    /// Whether the column is unsigned.
    pub fn is_unsigned(&self) -> bool {
        self.has(&ColumnModifier::Unsigned)
    }

    /// Whether the column accepts null.
    pub fn is_nullable(&self) -> bool {
        self.has(&ColumnModifier::Nullable)
    }

    /// Whether the column carries a single-column primary marker.
    pub fn is_primary(&self) -> bool {
        self.has(&ColumnModifier::Primary)
    }

    /// The default expression, if any.
    pub fn default_expr(&self) -> Option<&DefaultExpr> {
        self.modifiers.iter().find_map(|m| match m {
            ColumnModifier::Default(expr) => Some(expr),
            _ => None,
        })
    }

    /// The column comment, if any.
    pub fn comment(&self) -> Option<&str> {
        self.modifiers.iter().find_map(|m| match m {
            ColumnModifier::Comment(text) => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Storage type of a field after borrowing.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedType {
    /// Column type.
    pub column_type: ColumnType,
    /// Unsigned modifier applies.
    pub unsigned: bool,
    /// Kind the type was derived from.
    pub kind: FieldKind,
    /// Constraints the type was derived from.
    pub constraints: FieldConstraints,
}

/// Resolves field kinds to column types.
pub struct FieldTypeResolver<'a> {
    source: &'a SchemaSource,
    config: &'a CompilerConfig,
}

impl<'a> FieldTypeResolver<'a> {
    /// Create a resolver over a schema source.
    pub fn new(source: &'a SchemaSource, config: &'a CompilerConfig) -> Self {
        Self { source, config }
    }

    /// Resolve a stored field to a column.
    ///
    /// `single_primary` is false when the field is part of a composite key,
    /// in which case no per-column primary marker is emitted.
    pub fn column(
        &self,
        table: &TableDef,
        field: &FieldDef,
        single_primary: bool,
    ) -> Result<ColumnDef, SchemaError> {
        let resolved = self.resolve(table, field)?;
        let mut column = ColumnDef::new(&field.name, resolved.column_type);

        if resolved.unsigned {
            column = column.with_modifier(ColumnModifier::Unsigned);
        }
        if single_primary && field.is_primary() {
            column = column.with_modifier(ColumnModifier::Primary);
        }
        if let Some(default) = &field.default {
            column = column.with_modifier(ColumnModifier::Default(default.into()));
        }
        column = column.with_modifier(if field.nullable {
            ColumnModifier::Nullable
        } else {
            ColumnModifier::NotNullable
        });
        if field.index {
            column = column.with_modifier(ColumnModifier::Index);
        }
        if field.unique {
            column = column.with_modifier(ColumnModifier::Unique);
        }
        if let Some(description) = &field.description {
            column = column.with_modifier(ColumnModifier::Comment(description.clone()));
        }

        Ok(column)
    }

    /// Resolve the storage type of a field, applying the borrowed-field rule
    /// to `fk` fields.
    pub fn resolve(&self, table: &TableDef, field: &FieldDef) -> Result<ResolvedType, SchemaError> {
        let mut visiting = HashSet::new();
        self.resolve_inner(table, field, &mut visiting)
    }

    fn resolve_inner(
        &self,
        table: &TableDef,
        field: &FieldDef,
        visiting: &mut HashSet<(String, String)>,
    ) -> Result<ResolvedType, SchemaError> {
        if field.kind != FieldKind::Fk {
            return self.resolve_kind(table, field, field.kind, &field.constraints);
        }

        if !visiting.insert((table.name.clone(), field.name.clone())) {
            return Err(SchemaError::CircularForeignKey {
                table: table.name.clone(),
                field: field.name.clone(),
            });
        }

        let target = field
            .foreign_key_target()
            .ok_or_else(|| SchemaError::MissingTarget {
                table: table.name.clone(),
                field: field.name.clone(),
                what: "referenced table",
            })?;
        let context = format!("foreign key {}.{}", table.name, field.name);
        let target_table =
            self.source
                .get_table(&target.table)
                .ok_or_else(|| SchemaError::UnknownTable {
                    context: context.clone(),
                    target: target.table.clone(),
                })?;

        let borrowed = match target_table.get_field(&target.to).filter(|f| f.is_stored()) {
            Some(referenced) if referenced.kind == FieldKind::Fk => {
                self.resolve_inner(target_table, referenced, visiting)?
            }
            Some(referenced) => {
                if !referenced.kind.is_storage_scalar() {
                    return Err(SchemaError::UnsupportedBorrowedType {
                        table: table.name.clone(),
                        field: field.name.clone(),
                        kind: referenced.kind,
                        target: format!("{}.{}", target_table.name, referenced.name),
                    });
                }
                self.resolve_kind(
                    target_table,
                    referenced,
                    referenced.kind,
                    &referenced.constraints,
                )?
            }
            None => self.resolve_generated(target_table, &target.to).ok_or_else(|| {
                SchemaError::UnknownColumn {
                    context,
                    table: target_table.name.clone(),
                    column: target.to.clone(),
                }
            })?,
        };

        // Reference to an auto-increment column: plain unsigned integer.
        if borrowed.column_type == ColumnType::Increments {
            return Ok(ResolvedType {
                column_type: ColumnType::Integer,
                unsigned: true,
                kind: FieldKind::Integer,
                constraints: FieldConstraints {
                    minimum: Some(1.0),
                    unsigned: true,
                    ..Default::default()
                },
            });
        }

        Ok(borrowed)
    }

    /// Type of a column the generator adds on its own.
    fn resolve_generated(&self, table: &TableDef, column: &str) -> Option<ResolvedType> {
        if !table.has_explicit_primary() && column == self.config.key_column {
            return Some(ResolvedType {
                column_type: ColumnType::Increments,
                unsigned: true,
                kind: FieldKind::Id,
                constraints: FieldConstraints::default(),
            });
        }
        let timestamps = &self.config.timestamps;
        if table.has_default_fields()
            && (column == timestamps.updated || column == timestamps.created)
        {
            return Some(ResolvedType {
                column_type: ColumnType::DateTime,
                unsigned: false,
                kind: FieldKind::DateTime,
                constraints: FieldConstraints::default(),
            });
        }
        None
    }

    fn resolve_kind(
        &self,
        table: &TableDef,
        field: &FieldDef,
        kind: FieldKind,
        constraints: &FieldConstraints,
    ) -> Result<ResolvedType, SchemaError> {
        let (column_type, unsigned) = match kind {
            FieldKind::Id => (ColumnType::Increments, true),
            FieldKind::String => (self.string_type(constraints), false),
            FieldKind::Integer => (
                ColumnType::Integer,
                constraints.unsigned || constraints.minimum.is_some_and(|min| min >= 0.0),
            ),
            FieldKind::Number => (ColumnType::Float, false),
            FieldKind::Boolean => (ColumnType::Boolean, false),
            FieldKind::Date => (ColumnType::Date, false),
            FieldKind::Time => (ColumnType::Time, false),
            FieldKind::DateTime => (ColumnType::DateTime, false),
            FieldKind::Json => (ColumnType::Json, false),
            FieldKind::Relation | FieldKind::Fk => {
                return Err(SchemaError::UnknownFieldKind {
                    table: table.name.clone(),
                    field: field.name.clone(),
                    kind: kind.to_string(),
                })
            }
        };

        Ok(ResolvedType {
            column_type,
            unsigned,
            kind,
            constraints: constraints.clone(),
        })
    }

    fn string_type(&self, constraints: &FieldConstraints) -> ColumnType {
        if let Some(values) = &constraints.enum_values {
            return ColumnType::Enum {
                values: values.clone(),
            };
        }
        match constraints.max_length {
            Some(length) if length > MAX_STRING_LENGTH => ColumnType::Text,
            Some(length) => ColumnType::String { length },
            None => ColumnType::String {
                length: self.config.default_string_length,
            },
        }
    }
}
