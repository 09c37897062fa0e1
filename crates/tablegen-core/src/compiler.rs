//! Compilation driver.
//!
//! Runs the pipeline over a schema source:
//!
//! 1. resolve external fragments concurrently,
//! 2. plan every table,
//! 3. derive validation schemas and register one descriptor per table,
//! 4. resolve relations and foreign keys once every descriptor exists,
//!
//! and applies the resulting plan to a storage driver.

use crate::catalog::SchemaSource;
use crate::config::CompilerConfig;
use crate::ddl::{SchemaPlan, TableDdlGenerator};
use crate::driver::StorageDriver;
use crate::error::{Result, StorageError};
use crate::fragment::{resolve_all, FragmentResolver};
use crate::model::{ModelDescriptor, ModelMetadataBuilder, SchemaDocumentBuilder};
use crate::relation::{ModelRef, RelationMap, RelationResolver, ResolvedRelation};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info};

/// Output of one compilation.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledSchema {
    /// DDL plan.
    pub plan: SchemaPlan,
    /// Model descriptors, in table declaration order.
    pub models: Vec<ModelDescriptor>,
}

impl CompiledSchema {
    /// Look up a model by reference.
    pub fn model(&self, model: &ModelRef) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.model_name == model.as_str())
    }

    /// Look up a model by table name.
    pub fn table_model(&self, table: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.table_name == table)
    }

    /// The model a relation points to.
    pub fn relation_target(&self, relation: &ResolvedRelation) -> Option<&ModelDescriptor> {
        self.model(&relation.target)
    }

    /// The join-table model of a many-to-many relation.
    pub fn through_model(&self, relation: &ResolvedRelation) -> Option<&ModelDescriptor> {
        relation
            .join
            .through
            .as_ref()
            .and_then(|through| self.model(&through.model))
    }
}

/// Schema compiler.
pub struct Compiler<R> {
    resolver: R,
    config: CompilerConfig,
}

impl<R: FragmentResolver> Compiler<R> {
    /// Create a compiler.
    pub fn new(resolver: R, config: CompilerConfig) -> Self {
        Self { resolver, config }
    }

    /// The compiler configuration.
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile a schema source.
    pub async fn compile(&self, source: &SchemaSource) -> Result<CompiledSchema> {
        let start = Instant::now();
        let references = source.fragment_refs();
        let fragments = resolve_all(&self.resolver, &references).await?;
        debug!(fragments = fragments.len(), "Resolved schema fragments");

        let generator = TableDdlGenerator::new(source, &self.config);
        let tables = source
            .tables()
            .iter()
            .map(|table| generator.generate(table))
            .collect::<Result<Vec<_>, _>>()?;

        let documents = SchemaDocumentBuilder::new(source, &self.config, &fragments);
        let builder = ModelMetadataBuilder::new(&self.config);
        let mut models = Vec::with_capacity(tables.len());
        for (table, plan) in source.tables().iter().zip(&tables) {
            let schema = documents.build(table)?;
            models.push(builder.build(table, plan, schema, RelationMap::new()));
        }

        let mut resolved = RelationResolver::new(source, &self.config).resolve()?;
        for model in &mut models {
            model.relations = resolved.take_relations(&model.table_name);
        }

        let plan = SchemaPlan {
            tables,
            foreign_keys: resolved.foreign_keys,
        };

        info!(
            tables = plan.tables.len(),
            fragments = references.len(),
            relations = models.iter().map(|m| m.relations.len()).sum::<usize>(),
            foreign_keys = plan.foreign_keys.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Schema compiled"
        );

        Ok(CompiledSchema { plan, models })
    }
}

/// Apply a plan: create every table in order, then add every foreign key.
///
/// The first rejected operation aborts. Tables created before it are left
/// in place.
pub async fn apply<D>(plan: &SchemaPlan, driver: &mut D) -> Result<()>
where
    D: StorageDriver + ?Sized,
{
    for table in &plan.tables {
        driver
            .create_table(table)
            .await
            .map_err(|source| StorageError {
                table: table.table.clone(),
                operation: "create table".to_string(),
                source,
            })?;
        debug!(table = %table.table, ops = table.ops.len(), "Created table");
    }

    for fk in &plan.foreign_keys {
        driver
            .add_foreign_key(fk)
            .await
            .map_err(|source| StorageError {
                table: fk.table.clone(),
                operation: "add foreign key".to_string(),
                source,
            })?;
        debug!(constraint = %fk.constraint_name(), cascade = fk.cascade, "Added foreign key");
    }

    info!(
        tables = plan.tables.len(),
        foreign_keys = plan.foreign_keys.len(),
        "Schema applied"
    );
    Ok(())
}
