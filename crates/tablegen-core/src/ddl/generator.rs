//! Table DDL generation.
//!
//! Produces the creation plan of one table without looking at relations;
//! foreign keys are added in a later pass once every table exists.

use super::column::{ColumnDef, ColumnModifier, ColumnType, DefaultExpr, FieldTypeResolver};
use super::plan::{TableOp, TablePlan};
use crate::catalog::{FieldKind, SchemaSource, TableDef};
use crate::config::CompilerConfig;
use crate::error::SchemaError;
use tracing::debug;

/// Generates table-creation plans.
pub struct TableDdlGenerator<'a> {
    resolver: FieldTypeResolver<'a>,
    config: &'a CompilerConfig,
}

impl<'a> TableDdlGenerator<'a> {
    /// Create a generator over a schema source.
    pub fn new(source: &'a SchemaSource, config: &'a CompilerConfig) -> Self {
        Self {
            resolver: FieldTypeResolver::new(source, config),
            config,
        }
    }

    /// Generate the creation plan of one table.
    pub fn generate(&self, table: &TableDef) -> Result<TablePlan, SchemaError> {
        let mut plan = TablePlan::new(&table.name);
        let primary: Vec<_> = table.primary_fields().collect();

        if primary.is_empty() {
            self.ensure_free(table, &self.config.key_column)?;
            plan.push(TableOp::Column(
                ColumnDef::new(&self.config.key_column, ColumnType::Increments)
                    .with_modifier(ColumnModifier::Unsigned)
                    .with_modifier(ColumnModifier::Primary)
                    .with_modifier(ColumnModifier::NotNullable),
            ));
        }

        let composite = primary.len() > 1;
        if composite {
            if let Some(auto) = primary.iter().find(|f| f.kind == FieldKind::Id) {
                return Err(SchemaError::AmbiguousPrimaryKey {
                    table: table.name.clone(),
                    fields: primary.iter().map(|f| f.name.clone()).collect(),
                    auto: auto.name.clone(),
                });
            }
        }

        for field in table.stored_fields() {
            plan.push(TableOp::Column(self.resolver.column(table, field, !composite)?));
        }

        if composite {
            plan.push(TableOp::CompositePrimary {
                columns: primary.iter().map(|f| f.name.clone()).collect(),
            });
        }

        if table.has_default_fields() {
            for name in [&self.config.timestamps.updated, &self.config.timestamps.created] {
                self.ensure_free(table, name)?;
                plan.push(TableOp::Column(
                    ColumnDef::new(name, ColumnType::DateTime)
                        .with_modifier(ColumnModifier::Default(DefaultExpr::Now))
                        .with_modifier(ColumnModifier::NotNullable),
                ));
            }
        }

        for index in &table.indexes {
            if let Some(missing) = index
                .columns
                .iter()
                .find(|c| !table.has_column(c, self.config))
            {
                return Err(SchemaError::UnknownColumn {
                    context: format!("index on {}", table.name),
                    table: table.name.clone(),
                    column: missing.clone(),
                });
            }
            plan.push(TableOp::Index {
                columns: index.columns.clone(),
                unique: index.unique,
            });
        }

        debug!(
            table = %table.name,
            ops = plan.ops.len(),
            composite_primary = composite,
            "Generated table plan"
        );

        Ok(plan)
    }

    /// A generated column must not collide with a declared field.
    fn ensure_free(&self, table: &TableDef, column: &str) -> Result<(), SchemaError> {
        if table.get_field(column).is_some_and(|f| f.is_stored()) {
            return Err(SchemaError::DuplicateField {
                table: table.name.clone(),
                field: column.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldDef, IndexDef, RelationKind};

    fn generate(tables: Vec<TableDef>, name: &str) -> Result<TablePlan, SchemaError> {
        let config = CompilerConfig::default();
        let source = SchemaSource::new(tables, vec![]).unwrap();
        let table = source.get_table(name).unwrap();
        TableDdlGenerator::new(&source, &config).generate(table)
    }

    #[test]
    fn test_explicit_id_table() {
        let table = TableDef::new("customer", "Customer")
            .with_field(FieldDef::id("id"))
            .with_field(FieldDef::new("name", FieldKind::String))
            .with_field(FieldDef::relation("orders", RelationKind::HasMany, "order"))
            .with_field(FieldDef::new("label", FieldKind::String).computed());

        let plan = generate(vec![table], "customer").unwrap();
        let names: Vec<_> = plan.columns().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "updated_at", "created_at"]);

        let id = plan.column("id").unwrap();
        assert_eq!(id.column_type, ColumnType::Increments);
        assert!(id.is_primary());

        let updated = plan.column("updated_at").unwrap();
        assert_eq!(updated.default_expr(), Some(&DefaultExpr::Now));
        assert!(updated.has(&ColumnModifier::NotNullable));
    }

    #[test]
    fn test_legacy_implicit_key() {
        let table = TableDef::new("tag", "Tag")
            .with_field(FieldDef::new("label", FieldKind::String))
            .without_default_fields();

        let plan = generate(vec![table], "tag").unwrap();
        let names: Vec<_> = plan.columns().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "label"]);
        assert_eq!(plan.key_columns(), vec!["id"]);
    }

    #[test]
    fn test_implicit_key_collision() {
        let table = TableDef::new("tag", "Tag").with_field(FieldDef::new("id", FieldKind::String));
        assert!(matches!(
            generate(vec![table], "tag").unwrap_err(),
            SchemaError::DuplicateField { .. }
        ));
    }

    #[test]
    fn test_composite_primary() {
        let table = TableDef::new("review", "Review")
            .with_field(FieldDef::new("criticId", FieldKind::Integer).primary())
            .with_field(FieldDef::new("movieId", FieldKind::Integer).primary())
            .with_field(FieldDef::new("rating", FieldKind::Integer));

        let plan = generate(vec![table], "review").unwrap();
        assert!(plan.columns().all(|c| !c.is_primary()));
        assert_eq!(
            plan.composite_primary().unwrap(),
            &["criticId".to_string(), "movieId".to_string()]
        );
        assert_eq!(
            plan.ops.iter().filter(|op| matches!(op, TableOp::CompositePrimary { .. })).count(),
            1
        );
    }

    #[test]
    fn test_composite_with_auto_increment() {
        let table = TableDef::new("bad", "Bad")
            .with_field(FieldDef::id("id"))
            .with_field(FieldDef::new("code", FieldKind::String).primary());

        assert!(matches!(
            generate(vec![table], "bad").unwrap_err(),
            SchemaError::AmbiguousPrimaryKey { ref auto, .. } if auto == "id"
        ));
    }

    #[test]
    fn test_indexes() {
        let table = TableDef::new("person", "Person")
            .with_field(FieldDef::id("id"))
            .with_field(FieldDef::new("email", FieldKind::String))
            .with_index(IndexDef::unique(["email"]))
            .with_index(IndexDef::new(["created_at"]));

        let plan = generate(vec![table.clone()], "person").unwrap();
        assert_eq!(
            plan.ops.last(),
            Some(&TableOp::Index {
                columns: vec!["created_at".to_string()],
                unique: false,
            })
        );

        let broken = table.with_index(IndexDef::new(["missing"]));
        assert!(matches!(
            generate(vec![broken], "person").unwrap_err(),
            SchemaError::UnknownColumn { ref column, .. } if column == "missing"
        ));
    }
}
