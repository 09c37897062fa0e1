//! Standalone relation definitions between tables.

use super::types::RelationKind;
use serde::{Serialize, Serializer};
use std::fmt;

/// A `table.column` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnRef {
    /// Table name.
    pub table: String,
    /// Column name.
    pub column: String,
}

/// Join description of a standalone relation.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinDef {
    /// Endpoint on the owning table.
    pub from: ColumnRef,
    /// Endpoint on the target table.
    pub to: ColumnRef,
    /// Join table for many-to-many relations.
    pub through: Option<ThroughDef>,
}

/// Join-table description of a standalone many-to-many relation.
#[derive(Debug, Clone, PartialEq)]
pub struct ThroughDef {
    /// Join-table column referencing the owning side.
    pub from: ColumnRef,
    /// Join-table column referencing the target side.
    pub to: ColumnRef,
    /// Extra join-table columns exposed on the relation.
    pub extra: Vec<String>,
    /// Model name of the join table.
    pub model_name: String,
}

/// A relation declared outside of any table's field list.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationDef {
    /// Relation name (unique within the owning table's relation map).
    pub name: String,
    /// Relation variant.
    pub kind: RelationKind,
    /// Model name of the target.
    pub model_name: String,
    /// Join description.
    pub join: JoinDef,
    /// Cascade deletes through the implied foreign key.
    pub cascade_on_delete: bool,
}

impl ColumnRef {
    /// Create a column reference.
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

impl Serialize for ColumnRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl RelationDef {
    /// Create a relation from `from` to `to`.
    pub fn new(
        name: impl Into<String>,
        kind: RelationKind,
        model_name: impl Into<String>,
        from: ColumnRef,
        to: ColumnRef,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            model_name: model_name.into(),
            join: JoinDef {
                from,
                to,
                through: None,
            },
            cascade_on_delete: false,
        }
    }

    /// Set the join table.
    pub fn with_through(mut self, through: ThroughDef) -> Self {
        self.join.through = Some(through);
        self
    }

    /// Opt into cascading deletes.
    pub fn cascade_on_delete(mut self) -> Self {
        self.cascade_on_delete = true;
        self
    }

    /// The owning table.
    pub fn owner(&self) -> &str {
        &self.join.from.table
    }
}

impl ThroughDef {
    /// Create a join-table description.
    pub fn new(from: ColumnRef, to: ColumnRef, model_name: impl Into<String>) -> Self {
        Self {
            from,
            to,
            extra: Vec::new(),
            model_name: model_name.into(),
        }
    }

    /// Set the extra columns.
    pub fn with_extra(mut self, extra: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extra = extra.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_ref_display() {
        let column = ColumnRef::new("review", "criticId");
        assert_eq!(column.to_string(), "review.criticId");
        assert_eq!(
            serde_json::to_value(&column).unwrap(),
            serde_json::json!("review.criticId")
        );
    }

    #[test]
    fn test_many_to_many_relation() {
        let rel = RelationDef::new(
            "reviews",
            RelationKind::ManyToMany,
            "Movie",
            ColumnRef::new("critic", "id"),
            ColumnRef::new("movie", "id"),
        )
        .with_through(
            ThroughDef::new(
                ColumnRef::new("review", "criticId"),
                ColumnRef::new("review", "movieId"),
                "Review",
            )
            .with_extra(["rating", "body"]),
        )
        .cascade_on_delete();

        assert_eq!(rel.owner(), "critic");
        assert!(rel.kind.is_many_to_many());
        assert_eq!(rel.join.through.as_ref().unwrap().extra.len(), 2);
        assert!(rel.cascade_on_delete);
    }
}
