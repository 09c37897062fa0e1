//! Resolved relation joins.

use super::registry::ModelRef;
use crate::catalog::{ColumnRef, RelationKind};
use serde::Serialize;
use std::collections::BTreeMap;

/// Relations of one table, keyed by relation name.
pub type RelationMap = BTreeMap<String, ResolvedRelation>;

/// A relation with both endpoints checked against the schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRelation {
    /// Relation name.
    pub name: String,
    /// Relation variant.
    pub kind: RelationKind,
    /// Target model.
    pub target: ModelRef,
    /// Join endpoints.
    pub join: ResolvedJoin,
    /// Cascade deletes through the implied foreign key.
    pub cascade_on_delete: bool,
}

/// Join endpoints of a resolved relation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedJoin {
    /// Endpoint on the owning table.
    pub from: ColumnRef,
    /// Endpoint on the target table.
    pub to: ColumnRef,
    /// Join table of a many-to-many relation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub through: Option<ResolvedThrough>,
}

/// Join-table endpoints of a resolved many-to-many relation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedThrough {
    /// Join-table column referencing the owning side.
    pub from: ColumnRef,
    /// Join-table column referencing the target side.
    pub to: ColumnRef,
    /// Extra join-table columns exposed on the relation.
    pub extra: Vec<String>,
    /// Model of the join table.
    pub model: ModelRef,
}

impl ResolvedRelation {
    /// The owning table.
    pub fn owner(&self) -> &str {
        &self.join.from.table
    }

    /// The target table.
    pub fn target_table(&self) -> &str {
        &self.join.to.table
    }

    /// The join table, for many-to-many relations.
    pub fn through_table(&self) -> Option<&str> {
        self.join.through.as_ref().map(|t| t.from.table.as_str())
    }

    /// Whether `other` describes the same join table and model seen from the
    /// other side.
    pub fn mirrors(&self, other: &ResolvedRelation) -> bool {
        match (&self.join.through, &other.join.through) {
            (Some(mine), Some(theirs)) => {
                mine.from.table == theirs.from.table
                    && mine.model == theirs.model
                    && mine.from == theirs.to
                    && mine.to == theirs.from
            }
            _ => false,
        }
    }
}

impl ResolvedThrough {
    /// Describe the join table as `table(from, to)`.
    pub fn describe(&self) -> String {
        format!("{}({}, {})", self.from.table, self.from.column, self.to.column)
    }
}
