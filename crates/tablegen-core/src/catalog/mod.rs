//! Schema catalog.
//!
//! Declarative table, field and relation definitions, parsed once from the
//! schema source and immutable for the rest of the compilation.

pub mod document;
mod field;
mod relation;
mod source;
mod table;
mod types;

pub use document::{ProjectDocument, NOW_SENTINEL};
pub use field::{
    DefaultValue, FieldConstraints, FieldDef, FieldTarget, ForeignKeyTarget, RelationTarget,
    ThroughTarget,
};
pub use relation::{ColumnRef, JoinDef, RelationDef, ThroughDef};
pub use source::SchemaSource;
pub use table::{ForeignKeyDef, IndexDef, TableDef};
pub use types::{FieldKind, RelationKind};
