//! Relation and foreign-key resolution.
//!
//! Runs after every table is registered. Relations declared as `relation`
//! fields and as standalone relations are resolved to joins; foreign keys
//! implied by `fk` fields, explicit key entries and owning relations are
//! collected and deduplicated.

use super::join::{RelationMap, ResolvedJoin, ResolvedRelation, ResolvedThrough};
use super::registry::{ModelRef, ModelRegistry};
use crate::catalog::{ColumnRef, FieldDef, RelationDef, SchemaSource, TableDef};
use crate::config::CompilerConfig;
use crate::ddl::ForeignKeyOp;
use crate::error::SchemaError;
use std::collections::BTreeMap;
use tracing::debug;

/// Output of relation resolution.
#[derive(Debug, Clone, Default)]
pub struct ResolvedRelations {
    /// Relation map per table name. Every table has an entry.
    pub maps: BTreeMap<String, RelationMap>,
    /// Deferred foreign keys, deduplicated, in declaration order.
    pub foreign_keys: Vec<ForeignKeyOp>,
}

impl ResolvedRelations {
    /// Relations owned by a table.
    pub fn relations_of(&self, table: &str) -> Option<&RelationMap> {
        self.maps.get(table)
    }

    /// Take the relation map of a table.
    pub fn take_relations(&mut self, table: &str) -> RelationMap {
        self.maps.remove(table).unwrap_or_default()
    }
}

/// Two-phase relation resolver.
pub struct RelationResolver<'a> {
    source: &'a SchemaSource,
    config: &'a CompilerConfig,
    registry: ModelRegistry<'a>,
}

impl<'a> RelationResolver<'a> {
    /// Register every table of the source.
    pub fn new(source: &'a SchemaSource, config: &'a CompilerConfig) -> Self {
        Self {
            source,
            config,
            registry: ModelRegistry::from_source(source),
        }
    }

    /// Resolve every relation and foreign key.
    pub fn resolve(&self) -> Result<ResolvedRelations, SchemaError> {
        let mut maps: BTreeMap<String, RelationMap> = self
            .source
            .tables()
            .iter()
            .map(|t| (t.name.clone(), RelationMap::new()))
            .collect();

        for table in self.source.tables() {
            for field in table.relation_fields() {
                let relation = self.resolve_field(table, field)?;
                insert(&mut maps, relation)?;
            }
        }

        for relation in self.source.relations() {
            let resolved = self.resolve_standalone(relation)?;
            insert(&mut maps, resolved)?;
        }

        self.check_counterparts(&maps)?;
        let foreign_keys = self.foreign_keys(&maps)?;

        debug!(
            relations = maps.values().map(|m| m.len()).sum::<usize>(),
            foreign_keys = foreign_keys.len(),
            "Resolved relations"
        );

        Ok(ResolvedRelations { maps, foreign_keys })
    }

    fn resolve_field(
        &self,
        table: &TableDef,
        field: &FieldDef,
    ) -> Result<ResolvedRelation, SchemaError> {
        let target = field
            .relation_target()
            .ok_or_else(|| SchemaError::MissingTarget {
                table: table.name.clone(),
                field: field.name.clone(),
                what: "target table",
            })?;
        let context = format!("relation {}.{}", table.name, field.name);
        let target_table =
            self.registry
                .table(&target.table)
                .ok_or_else(|| SchemaError::UnknownTable {
                    context: context.clone(),
                    target: target.table.clone(),
                })?;

        let from = match &target.from {
            Some(column) => column.clone(),
            None => self.single_key(table, table, field, "owning column")?,
        };
        let to = match &target.to {
            Some(column) => column.clone(),
            None => self.single_key(target_table, table, field, "target column")?,
        };
        self.check_column(&context, table, &from)?;
        self.check_column(&context, target_table, &to)?;

        let through = if target.kind.is_many_to_many() {
            let through = target
                .through
                .as_ref()
                .ok_or_else(|| SchemaError::MissingThrough {
                    table: table.name.clone(),
                    relation: field.name.clone(),
                })?;
            let through_table = self.table(&context, &through.table)?;
            Some(self.resolve_through(
                &context,
                ColumnRef::new(&through_table.name, &through.from),
                ColumnRef::new(&through_table.name, &through.to),
                &through.extra,
                through.model_name.as_deref(),
            )?)
        } else {
            None
        };

        debug!(
            table = %table.name,
            relation = %field.name,
            kind = %target.kind,
            target = %target_table.model_name,
            "Resolved relation field"
        );

        Ok(ResolvedRelation {
            name: field.name.clone(),
            kind: target.kind,
            target: ModelRef::from(target_table),
            join: ResolvedJoin {
                from: ColumnRef::new(&table.name, from),
                to: ColumnRef::new(&target_table.name, to),
                through,
            },
            cascade_on_delete: target.cascade_on_delete,
        })
    }

    fn resolve_standalone(&self, relation: &RelationDef) -> Result<ResolvedRelation, SchemaError> {
        let context = format!("relation {}.{}", relation.owner(), relation.name);
        let owner = self.table(&context, &relation.join.from.table)?;
        let target = self
            .registry
            .model(&relation.model_name)
            .ok_or_else(|| SchemaError::UnknownModel {
                context: context.clone(),
                model: relation.model_name.clone(),
            })?;
        let to_table = self.table(&context, &relation.join.to.table)?;
        if to_table.name != target.name {
            return Err(SchemaError::TargetMismatch {
                table: owner.name.clone(),
                relation: relation.name.clone(),
                model: relation.model_name.clone(),
                joined: to_table.name.clone(),
            });
        }
        self.check_column(&context, owner, &relation.join.from.column)?;
        self.check_column(&context, to_table, &relation.join.to.column)?;

        let through = if relation.kind.is_many_to_many() {
            let through = relation
                .join
                .through
                .as_ref()
                .ok_or_else(|| SchemaError::MissingThrough {
                    table: owner.name.clone(),
                    relation: relation.name.clone(),
                })?;
            Some(self.resolve_through(
                &context,
                through.from.clone(),
                through.to.clone(),
                &through.extra,
                Some(&through.model_name),
            )?)
        } else {
            None
        };

        debug!(
            table = %owner.name,
            relation = %relation.name,
            kind = %relation.kind,
            target = %target.model_name,
            "Resolved standalone relation"
        );

        Ok(ResolvedRelation {
            name: relation.name.clone(),
            kind: relation.kind,
            target: ModelRef::from(target),
            join: ResolvedJoin {
                from: relation.join.from.clone(),
                to: relation.join.to.clone(),
                through,
            },
            cascade_on_delete: relation.cascade_on_delete,
        })
    }

    fn resolve_through(
        &self,
        context: &str,
        from: ColumnRef,
        to: ColumnRef,
        extra: &[String],
        model_name: Option<&str>,
    ) -> Result<ResolvedThrough, SchemaError> {
        let through_table = self.table(context, &from.table)?;
        let to_table = self.table(context, &to.table)?;
        self.check_column(context, through_table, &from.column)?;
        self.check_column(context, to_table, &to.column)?;
        for column in extra {
            self.check_column(context, through_table, column)?;
        }

        let model = match model_name {
            Some(name) => {
                let table = self
                    .registry
                    .model(name)
                    .ok_or_else(|| SchemaError::UnknownModel {
                        context: context.to_string(),
                        model: name.to_string(),
                    })?;
                ModelRef::from(table)
            }
            None => ModelRef::from(through_table),
        };

        Ok(ResolvedThrough {
            from,
            to,
            extra: extra.to_vec(),
            model,
        })
    }

    /// Both sides of a many-to-many pair must describe the same join table.
    ///
    /// A back-relation on the target running through the same join table is
    /// a counterpart. Failing that, the target's only back-relation is the
    /// counterpart unless another relation of the owner already pairs with
    /// it. A relation without a counterpart is accepted.
    fn check_counterparts(&self, maps: &BTreeMap<String, RelationMap>) -> Result<(), SchemaError> {
        for (table_name, map) in maps {
            let Some(owner) = self.registry.table(table_name) else {
                continue;
            };
            let owner_ref = ModelRef::from(owner);

            for relation in map.values().filter(|r| r.kind.is_many_to_many()) {
                let Some(target) = self.registry.resolve(&relation.target) else {
                    continue;
                };
                let Some(target_map) = maps.get(&target.name) else {
                    continue;
                };
                let self_referential = target.name == owner.name;

                let back: Vec<&ResolvedRelation> = target_map
                    .values()
                    .filter(|r| r.kind.is_many_to_many() && r.target == owner_ref)
                    .filter(|r| !(self_referential && r.name == relation.name))
                    .collect();
                let same_through: Vec<&ResolvedRelation> = back
                    .iter()
                    .copied()
                    .filter(|r| r.through_table() == relation.through_table())
                    .collect();

                let counterpart = match (same_through.first(), back.as_slice()) {
                    (Some(_), _) if same_through.iter().any(|c| relation.mirrors(c)) => continue,
                    (Some(first), _) => *first,
                    (None, [only])
                        if !self_referential && !paired_elsewhere(map, relation, only) =>
                    {
                        *only
                    }
                    _ => continue,
                };

                let describe = |r: &ResolvedRelation| {
                    r.join.through.as_ref().map_or_else(
                        || "no through table".to_string(),
                        |t| format!("{} as {}", t.describe(), t.model),
                    )
                };
                return Err(SchemaError::ThroughTableMismatch {
                    table: table_name.clone(),
                    relation: relation.name.clone(),
                    counterpart: format!("{}.{}", target.name, counterpart.name),
                    detail: format!("{} vs {}", describe(relation), describe(counterpart)),
                });
            }
        }
        Ok(())
    }

    fn foreign_keys(
        &self,
        maps: &BTreeMap<String, RelationMap>,
    ) -> Result<Vec<ForeignKeyOp>, SchemaError> {
        let mut ops = Vec::new();

        for table in self.source.tables() {
            for field in table.foreign_key_fields() {
                let Some(target) = field.foreign_key_target() else {
                    continue;
                };
                let context = format!("foreign key {}.{}", table.name, field.name);
                let target_table = self.table(&context, &target.table)?;
                self.check_column(&context, target_table, &target.to)?;
                push_unique(
                    &mut ops,
                    ForeignKeyOp::new(&table.name, &field.name, &target_table.name, &target.to)
                        .with_cascade(target.cascade_on_delete),
                );
            }

            for key in &table.foreign_keys {
                let context = format!("foreign key {}.{}", table.name, key.from);
                self.check_column(&context, table, &key.from)?;
                let target_table = self.table(&context, &key.table)?;
                self.check_column(&context, target_table, &key.to)?;
                push_unique(
                    &mut ops,
                    ForeignKeyOp::new(&table.name, &key.from, &target_table.name, &key.to)
                        .with_cascade(key.cascade_on_delete),
                );
            }

            let Some(map) = maps.get(&table.name) else {
                continue;
            };
            for relation in map.values().filter(|r| r.kind.owns_foreign_key()) {
                let op = match &relation.join.through {
                    Some(through) => ForeignKeyOp::new(
                        &through.from.table,
                        &through.from.column,
                        &relation.join.from.table,
                        &relation.join.from.column,
                    ),
                    None => ForeignKeyOp::new(
                        &relation.join.from.table,
                        &relation.join.from.column,
                        &relation.join.to.table,
                        &relation.join.to.column,
                    ),
                };
                push_unique(&mut ops, op.with_cascade(relation.cascade_on_delete));
            }
        }

        Ok(ops)
    }

    fn table(&self, context: &str, name: &str) -> Result<&'a TableDef, SchemaError> {
        self.registry
            .table(name)
            .ok_or_else(|| SchemaError::UnknownTable {
                context: context.to_string(),
                target: name.to_string(),
            })
    }

    fn check_column(
        &self,
        context: &str,
        table: &TableDef,
        column: &str,
    ) -> Result<(), SchemaError> {
        if table.has_column(column, self.config) {
            Ok(())
        } else {
            Err(SchemaError::UnknownColumn {
                context: context.to_string(),
                table: table.name.clone(),
                column: column.to_string(),
            })
        }
    }

    /// Default join column: the table's key, when it is a single column.
    fn single_key(
        &self,
        table: &TableDef,
        owner: &TableDef,
        field: &FieldDef,
        what: &'static str,
    ) -> Result<String, SchemaError> {
        match table.key_columns(self.config).as_slice() {
            [key] => Ok(key.clone()),
            _ => Err(SchemaError::MissingTarget {
                table: owner.name.clone(),
                field: field.name.clone(),
                what,
            }),
        }
    }
}

fn insert(
    maps: &mut BTreeMap<String, RelationMap>,
    relation: ResolvedRelation,
) -> Result<(), SchemaError> {
    let map = maps.entry(relation.owner().to_string()).or_default();
    if map.contains_key(&relation.name) {
        return Err(SchemaError::DuplicateField {
            table: relation.owner().to_string(),
            field: relation.name,
        });
    }
    map.insert(relation.name.clone(), relation);
    Ok(())
}

/// Whether another many-to-many relation of the owner runs through the join
/// table of `candidate`.
fn paired_elsewhere(
    owner_map: &RelationMap,
    relation: &ResolvedRelation,
    candidate: &ResolvedRelation,
) -> bool {
    owner_map.values().any(|r| {
        r.name != relation.name
            && r.kind.is_many_to_many()
            && r.target == relation.target
            && r.through_table() == candidate.through_table()
    })
}

/// Merge a foreign key into the list; cascade wins when declarations differ.
fn push_unique(ops: &mut Vec<ForeignKeyOp>, op: ForeignKeyOp) {
    match ops.iter_mut().find(|existing| existing.same_key(&op)) {
        Some(existing) => existing.cascade |= op.cascade,
        None => ops.push(op),
    }
}
