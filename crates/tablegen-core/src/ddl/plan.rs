//! DDL plans.
//!
//! A plan is the ordered list of operations that create the physical schema:
//! one `TablePlan` per table, followed by the deferred foreign keys.

use super::column::ColumnDef;
use serde::Serialize;

/// The complete DDL plan of a project.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaPlan {
    /// Table creations, in declaration order.
    pub tables: Vec<TablePlan>,
    /// Foreign keys, added once every table exists.
    pub foreign_keys: Vec<ForeignKeyOp>,
}

impl SchemaPlan {
    /// Get a table plan by name.
    pub fn table(&self, name: &str) -> Option<&TablePlan> {
        self.tables.iter().find(|t| t.table == name)
    }

    /// Foreign keys held by a table.
    pub fn foreign_keys_of(&self, table: &str) -> Vec<&ForeignKeyOp> {
        self.foreign_keys.iter().filter(|fk| fk.table == table).collect()
    }

    /// Total number of operations.
    pub fn op_count(&self) -> usize {
        self.tables.iter().map(|t| t.ops.len()).sum::<usize>() + self.foreign_keys.len()
    }

    /// Check if the plan creates nothing.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Operations creating one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TablePlan {
    /// Table name.
    pub table: String,
    /// Ordered operations.
    pub ops: Vec<TableOp>,
}

impl TablePlan {
    /// Create an empty plan for a table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ops: Vec::new(),
        }
    }

    /// Append an operation.
    pub fn push(&mut self, op: TableOp) {
        self.ops.push(op);
    }

    /// Column operations, in order.
    pub fn columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.ops.iter().filter_map(|op| match op {
            TableOp::Column(column) => Some(column),
            _ => None,
        })
    }

    /// Get a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns().find(|c| c.name == name)
    }

    /// Columns of the composite primary key, if one is declared.
    pub fn composite_primary(&self) -> Option<&[String]> {
        self.ops.iter().find_map(|op| match op {
            TableOp::CompositePrimary { columns } => Some(columns.as_slice()),
            _ => None,
        })
    }

    /// Key columns: the composite key, or every column marked primary.
    pub fn key_columns(&self) -> Vec<String> {
        match self.composite_primary() {
            Some(columns) => columns.to_vec(),
            None => self
                .columns()
                .filter(|c| c.is_primary())
                .map(|c| c.name.clone())
                .collect(),
        }
    }
}

/// One table-creation operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum TableOp {
    /// Add a column.
    Column(ColumnDef),
    /// Declare a multi-column primary key.
    CompositePrimary {
        /// Key columns, in order.
        columns: Vec<String>,
    },
    /// Add an index.
    Index {
        /// Indexed columns, in order.
        columns: Vec<String>,
        /// Unique index.
        unique: bool,
    },
}

impl TableOp {
    /// Constraint or index name, for operations that carry one.
    pub fn constraint_name(&self, table: &str) -> Option<String> {
        match self {
            TableOp::Column(_) => None,
            TableOp::CompositePrimary { .. } => Some(format!("{}_pkey", table)),
            TableOp::Index { columns, unique } => Some(format!(
                "{}_{}_{}",
                table,
                columns.join("_"),
                if *unique { "unique" } else { "index" }
            )),
        }
    }

    /// Get a description of this operation.
    pub fn description(&self, table: &str) -> String {
        match self {
            TableOp::Column(column) => format!(
                "Add column '{}.{}' ({})",
                table,
                column.name,
                column.column_type.constructor()
            ),
            TableOp::CompositePrimary { columns } => {
                format!("Add primary key on '{}' ({})", table, columns.join(", "))
            }
            TableOp::Index { columns, unique } => format!(
                "Add {}index on '{}' ({})",
                if *unique { "unique " } else { "" },
                table,
                columns.join(", ")
            ),
        }
    }
}

/// A deferred foreign-key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyOp {
    /// Table holding the key.
    pub table: String,
    /// Key column.
    pub column: String,
    /// Referenced table.
    pub references_table: String,
    /// Referenced column.
    pub references_column: String,
    /// `ON DELETE CASCADE`.
    pub cascade: bool,
}

impl ForeignKeyOp {
    /// Create a foreign key without cascade.
    pub fn new(
        table: impl Into<String>,
        column: impl Into<String>,
        references_table: impl Into<String>,
        references_column: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            references_table: references_table.into(),
            references_column: references_column.into(),
            cascade: false,
        }
    }

    /// Enable `ON DELETE CASCADE`.
    pub fn with_cascade(mut self, cascade: bool) -> Self {
        self.cascade = cascade;
        self
    }

    /// Whether two operations constrain the same column to the same target.
    pub fn same_key(&self, other: &ForeignKeyOp) -> bool {
        self.table == other.table
            && self.column == other.column
            && self.references_table == other.references_table
            && self.references_column == other.references_column
    }

    /// Constraint name.
    pub fn constraint_name(&self) -> String {
        format!("{}_{}_foreign", self.table, self.column)
    }

    /// Get a description of this operation.
    pub fn description(&self) -> String {
        format!(
            "Add foreign key '{}.{}' -> '{}.{}'{}",
            self.table,
            self.column,
            self.references_table,
            self.references_column,
            if self.cascade { " ON DELETE CASCADE" } else { "" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddl::column::{ColumnModifier, ColumnType};

    #[test]
    fn test_table_plan_accessors() {
        let mut plan = TablePlan::new("review");
        plan.push(TableOp::Column(ColumnDef::new("criticId", ColumnType::Integer)));
        plan.push(TableOp::Column(ColumnDef::new("movieId", ColumnType::Integer)));
        plan.push(TableOp::CompositePrimary {
            columns: vec!["criticId".to_string(), "movieId".to_string()],
        });

        assert_eq!(plan.columns().count(), 2);
        assert!(plan.column("movieId").is_some());
        assert_eq!(plan.key_columns(), vec!["criticId", "movieId"]);
        assert_eq!(
            plan.ops[2].constraint_name("review").as_deref(),
            Some("review_pkey")
        );
    }

    #[test]
    fn test_key_columns_from_marker() {
        let mut plan = TablePlan::new("person");
        plan.push(TableOp::Column(
            ColumnDef::new("id", ColumnType::Increments).with_modifier(ColumnModifier::Primary),
        ));
        assert_eq!(plan.key_columns(), vec!["id"]);
        assert!(plan.composite_primary().is_none());
    }

    #[test]
    fn test_descriptions() {
        let index = TableOp::Index {
            columns: vec!["lastName".to_string(), "firstName".to_string()],
            unique: true,
        };
        assert_eq!(
            index.description("person"),
            "Add unique index on 'person' (lastName, firstName)"
        );
        assert_eq!(
            index.constraint_name("person").as_deref(),
            Some("person_lastName_firstName_unique")
        );

        let fk = ForeignKeyOp::new("order", "customerId", "customer", "id").with_cascade(true);
        assert_eq!(fk.constraint_name(), "order_customerId_foreign");
        assert_eq!(
            fk.description(),
            "Add foreign key 'order.customerId' -> 'customer.id' ON DELETE CASCADE"
        );
    }
}
