//! Data-definition planning.
//!
//! Turns table definitions into ordered column, key and index operations.

pub mod column;
pub mod generator;
pub mod plan;

pub use column::{
    ColumnDef, ColumnModifier, ColumnType, DefaultExpr, FieldTypeResolver, ResolvedType,
};
pub use generator::TableDdlGenerator;
pub use plan::{ForeignKeyOp, SchemaPlan, TableOp, TablePlan};
