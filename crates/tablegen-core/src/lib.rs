//! Tablegen Core - Schema compilation pipeline.
//!
//! Compiles declarative table definitions into a DDL plan for the relational
//! store and one model descriptor per table for the ORM runtime.

pub mod catalog;
pub mod codec;
pub mod compiler;
pub mod config;
pub mod ddl;
pub mod driver;
pub mod error;
pub mod fragment;
pub mod model;
pub mod relation;
pub mod sql;

pub use catalog::{
    FieldDef, FieldKind, ForeignKeyDef, IndexDef, ProjectDocument, RelationDef, RelationKind,
    SchemaSource, TableDef, ThroughTarget,
};
pub use codec::{DateTimeCodec, Record, TemporalFormat, Value};
pub use compiler::{apply, CompiledSchema, Compiler};
pub use config::{CompilerConfig, TimestampColumns};
pub use ddl::{ColumnDef, ColumnType, ForeignKeyOp, SchemaPlan, TableOp, TablePlan};
pub use driver::StorageDriver;
pub use error::{CodecError, Error, FragmentError, Result, SchemaError, StorageError};
pub use fragment::{FileFragmentResolver, FragmentResolver, MemoryFragmentResolver};
pub use model::{BaseDescriptor, Decorator, HookPoint, ModelDescriptor, ValidationSchema};
pub use relation::{ModelRef, RelationMap, ResolvedRelation};
pub use sql::SqlScriptDriver;
