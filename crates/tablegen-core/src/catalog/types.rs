//! Core type definitions for the catalog.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Abstract field kinds understood by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Auto-incrementing unsigned integer key.
    Id,
    /// Bounded string, text or enumeration.
    String,
    /// Integer value.
    Integer,
    /// Floating point value.
    Number,
    /// Boolean value.
    Boolean,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Date and time.
    #[serde(rename = "datetime")]
    DateTime,
    /// Structured document, optionally described by an external fragment.
    Json,
    /// Association to another table; never stored as a column.
    Relation,
    /// Foreign key column borrowing its storage type from the referenced field.
    Fk,
}

impl FieldKind {
    /// All kinds, in declaration order.
    pub const ALL: [FieldKind; 11] = [
        FieldKind::Id,
        FieldKind::String,
        FieldKind::Integer,
        FieldKind::Number,
        FieldKind::Boolean,
        FieldKind::Date,
        FieldKind::Time,
        FieldKind::DateTime,
        FieldKind::Json,
        FieldKind::Relation,
        FieldKind::Fk,
    ];

    /// The name used in schema documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Id => "id",
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Date => "date",
            FieldKind::Time => "time",
            FieldKind::DateTime => "datetime",
            FieldKind::Json => "json",
            FieldKind::Relation => "relation",
            FieldKind::Fk => "fk",
        }
    }

    /// Check if a column of this kind can be the target of a foreign key.
    pub fn is_storage_scalar(&self) -> bool {
        !matches!(self, FieldKind::Json | FieldKind::Relation)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Relation variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    /// The target holds a key referencing this table (one row).
    HasOne,
    /// The target holds a key referencing this table (many rows).
    HasMany,
    /// This table holds a key referencing the target.
    BelongsToOne,
    /// Rows are associated through a join table.
    ManyToMany,
}

impl RelationKind {
    /// The name used in schema documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::HasOne => "HasOne",
            RelationKind::HasMany => "HasMany",
            RelationKind::BelongsToOne => "BelongsToOne",
            RelationKind::ManyToMany => "ManyToMany",
        }
    }

    /// Check if this is a many-to-many relation.
    pub fn is_many_to_many(&self) -> bool {
        matches!(self, RelationKind::ManyToMany)
    }

    /// Whether a relation of this kind, declared on its owning table, implies a
    /// physical foreign key held by that side.
    pub fn owns_foreign_key(&self) -> bool {
        matches!(self, RelationKind::BelongsToOne | RelationKind::ManyToMany)
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HasOne" => Ok(RelationKind::HasOne),
            "HasMany" => Ok(RelationKind::HasMany),
            "BelongsToOne" => Ok(RelationKind::BelongsToOne),
            "ManyToMany" => Ok(RelationKind::ManyToMany),
            other => Err(other.to_string()),
        }
    }
}
