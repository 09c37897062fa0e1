//! Storage driver collaborator.

use crate::ddl::{ForeignKeyOp, TablePlan};
use crate::error::BoxError;
use async_trait::async_trait;

/// Applies DDL operations to a relational store.
///
/// Tables are created one at a time, in plan order. Foreign keys are added
/// only once every table exists.
#[async_trait]
pub trait StorageDriver: Send {
    /// Create one table with its columns, key and indexes.
    async fn create_table(&mut self, plan: &TablePlan) -> Result<(), BoxError>;

    /// Add one foreign-key constraint to an existing table.
    async fn add_foreign_key(&mut self, op: &ForeignKeyOp) -> Result<(), BoxError>;
}
