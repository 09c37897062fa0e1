//! Model descriptor assembly.

use super::descriptor::ModelDescriptor;
use super::hooks::{BaseDescriptor, DecoratorContext};
use super::json_schema::ValidationSchema;
use crate::catalog::TableDef;
use crate::config::CompilerConfig;
use crate::ddl::TablePlan;
use crate::relation::RelationMap;
use tracing::{debug, warn};

/// Assembles model descriptors.
pub struct ModelMetadataBuilder<'a> {
    config: &'a CompilerConfig,
    standard: BaseDescriptor,
}

impl<'a> ModelMetadataBuilder<'a> {
    /// Create a builder using the standard base descriptor.
    pub fn new(config: &'a CompilerConfig) -> Self {
        Self {
            config,
            standard: BaseDescriptor::standard(),
        }
    }

    /// The base descriptor of a table: the standard base, followed by the
    /// table's registered override if it names one.
    pub fn base_for(&self, table: &TableDef) -> BaseDescriptor {
        let Some(name) = &table.base_model else {
            return self.standard.clone();
        };
        match self.config.base_model(name) {
            Some(base) => self.standard.clone().merge(base),
            None => {
                warn!(
                    table = %table.name,
                    base_model = %name,
                    "Base model not registered, using the default"
                );
                self.standard.clone()
            }
        }
    }

    /// Build the descriptor of one table.
    pub fn build(
        &self,
        table: &TableDef,
        plan: &TablePlan,
        json_schema: ValidationSchema,
        relations: RelationMap,
    ) -> ModelDescriptor {
        let base = self.base_for(table);
        let hooks = base.hooks(&DecoratorContext {
            table,
            schema: &json_schema,
            config: self.config,
        });

        let mut omit_from_storage = Vec::new();
        if table.has_default_fields() {
            omit_from_storage.push(self.config.timestamps.created.clone());
        }
        push_distinct(&mut omit_from_storage, &base.omit_from_storage);

        let mut virtual_attributes: Vec<String> =
            table.virtual_fields().map(|f| f.name.clone()).collect();
        push_distinct(&mut virtual_attributes, &base.virtual_attributes);

        debug!(
            table = %table.name,
            model = %table.model_name,
            relations = relations.len(),
            hooks = ?hooks,
            "Built model descriptor"
        );

        ModelDescriptor {
            model_name: table.model_name.clone(),
            table_name: table.name.clone(),
            id_columns: plan.key_columns(),
            json_schema,
            relations,
            virtual_attributes,
            omit_from_storage,
            decorators: base.decorator_names(),
            hooks,
        }
    }
}

fn push_distinct(target: &mut Vec<String>, extra: &[String]) {
    for item in extra {
        if !target.contains(item) {
            target.push(item.clone());
        }
    }
}
