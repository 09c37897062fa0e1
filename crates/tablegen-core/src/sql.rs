//! MySQL DDL rendering.
//!
//! [`SqlScriptDriver`] collects the statements a plan would issue instead of
//! executing them. Constraint names follow the knex conventions.

use crate::ddl::{
    ColumnDef, ColumnModifier, ColumnType, DefaultExpr, ForeignKeyOp, TableOp, TablePlan,
};
use crate::driver::StorageDriver;
use crate::error::BoxError;
use async_trait::async_trait;
use serde_json::Value as Json;
use std::collections::HashSet;

/// Quote an identifier.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quote a string literal.
pub fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\\', "\\\\").replace('\'', "''"))
}

fn ident_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_type(column_type: &ColumnType) -> String {
    match column_type {
        ColumnType::Increments => "int unsigned not null auto_increment primary key".to_string(),
        ColumnType::Integer => "int".to_string(),
        ColumnType::String { length } => format!("varchar({})", length),
        ColumnType::Text => "text".to_string(),
        ColumnType::Enum { values } => format!(
            "enum({})",
            values
                .iter()
                .map(|v| quote_literal(v))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        ColumnType::Float => "float(8, 2)".to_string(),
        ColumnType::Boolean => "boolean".to_string(),
        ColumnType::Date => "date".to_string(),
        ColumnType::Time => "time".to_string(),
        ColumnType::DateTime => "datetime".to_string(),
        ColumnType::Json => "json".to_string(),
    }
}

fn render_default(expr: &DefaultExpr) -> String {
    match expr {
        DefaultExpr::Now => "CURRENT_TIMESTAMP".to_string(),
        DefaultExpr::Literal(Json::Null) => "null".to_string(),
        DefaultExpr::Literal(Json::Bool(b)) => quote_literal(if *b { "1" } else { "0" }),
        DefaultExpr::Literal(Json::Number(n)) => quote_literal(&n.to_string()),
        DefaultExpr::Literal(Json::String(s)) => quote_literal(s),
        DefaultExpr::Literal(other) => quote_literal(&other.to_string()),
    }
}

/// Render a column definition, without its primary or index markers.
pub fn render_column(column: &ColumnDef) -> String {
    let mut sql = format!(
        "{} {}",
        quote_ident(&column.name),
        render_type(&column.column_type)
    );
    let increments = column.column_type == ColumnType::Increments;

    if column.is_unsigned() && !increments {
        sql.push_str(" unsigned");
    }
    for modifier in &column.modifiers {
        match modifier {
            ColumnModifier::NotNullable if !increments => sql.push_str(" not null"),
            ColumnModifier::Nullable => sql.push_str(" null"),
            ColumnModifier::Default(expr) => {
                sql.push_str(" default ");
                sql.push_str(&render_default(expr));
            }
            _ => {}
        }
    }
    if let Some(comment) = column.comment() {
        sql.push_str(" comment ");
        sql.push_str(&quote_literal(comment));
    }
    sql
}

fn render_index(table: &str, name: &str, columns: &[String], unique: bool) -> String {
    format!(
        "alter table {} add {} {}({})",
        quote_ident(table),
        if unique { "unique" } else { "index" },
        quote_ident(name),
        ident_list(columns)
    )
}

/// Render the statements creating one table.
///
/// The first statement is the `create table`; index statements follow, one
/// per distinct index name.
pub fn render_table(plan: &TablePlan) -> Vec<String> {
    let mut definitions = Vec::new();
    let mut indexes: Vec<(String, Vec<String>, bool)> = Vec::new();

    for op in &plan.ops {
        match op {
            TableOp::Column(column) => definitions.push(render_column(column)),
            TableOp::CompositePrimary { columns } => definitions.push(format!(
                "constraint {} primary key ({})",
                quote_ident(&op.constraint_name(&plan.table).unwrap_or_default()),
                ident_list(columns)
            )),
            TableOp::Index { columns, unique } => indexes.push((
                op.constraint_name(&plan.table).unwrap_or_default(),
                columns.clone(),
                *unique,
            )),
        }
    }

    for column in plan.columns() {
        if column.is_primary() && column.column_type != ColumnType::Increments {
            definitions.push(format!("primary key ({})", quote_ident(&column.name)));
        }
        for (modifier, unique) in [(ColumnModifier::Index, false), (ColumnModifier::Unique, true)] {
            if column.has(&modifier) {
                let op = TableOp::Index {
                    columns: vec![column.name.clone()],
                    unique,
                };
                indexes.push((
                    op.constraint_name(&plan.table).unwrap_or_default(),
                    vec![column.name.clone()],
                    unique,
                ));
            }
        }
    }

    let mut statements = vec![format!(
        "create table {} ({})",
        quote_ident(&plan.table),
        definitions.join(", ")
    )];
    let mut seen = HashSet::new();
    for (name, columns, unique) in indexes {
        if seen.insert(name.clone()) {
            statements.push(render_index(&plan.table, &name, &columns, unique));
        }
    }
    statements
}

/// Render a foreign-key constraint.
pub fn render_foreign_key(op: &ForeignKeyOp) -> String {
    let mut sql = format!(
        "alter table {} add constraint {} foreign key ({}) references {} ({})",
        quote_ident(&op.table),
        quote_ident(&op.constraint_name()),
        quote_ident(&op.column),
        quote_ident(&op.references_table),
        quote_ident(&op.references_column)
    );
    if op.cascade {
        sql.push_str(" on delete cascade");
    }
    sql
}

/// A storage driver that records MySQL statements.
///
/// Rejects the operations a live server would: creating a table twice, and
/// constraints touching tables that do not exist yet.
#[derive(Debug, Default)]
pub struct SqlScriptDriver {
    statements: Vec<String>,
    created: HashSet<String>,
}

impl SqlScriptDriver {
    /// Create an empty driver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Statements recorded so far, in order.
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    /// The recorded statements as one script.
    pub fn script(&self) -> String {
        self.statements
            .iter()
            .map(|s| format!("{};\n", s))
            .collect()
    }
}

#[async_trait]
impl StorageDriver for SqlScriptDriver {
    async fn create_table(&mut self, plan: &TablePlan) -> Result<(), BoxError> {
        if !self.created.insert(plan.table.clone()) {
            return Err(format!("table {} already exists", quote_ident(&plan.table)).into());
        }
        self.statements.extend(render_table(plan));
        Ok(())
    }

    async fn add_foreign_key(&mut self, op: &ForeignKeyOp) -> Result<(), BoxError> {
        for table in [&op.table, &op.references_table] {
            if !self.created.contains(table.as_str()) {
                return Err(format!("table {} doesn't exist", quote_ident(table)).into());
            }
        }
        self.statements.push(render_foreign_key(op));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn person_plan() -> TablePlan {
        let mut plan = TablePlan::new("person");
        plan.push(TableOp::Column(
            ColumnDef::new("id", ColumnType::Increments)
                .with_modifier(ColumnModifier::Unsigned)
                .with_modifier(ColumnModifier::Primary)
                .with_modifier(ColumnModifier::NotNullable),
        ));
        plan.push(TableOp::Column(
            ColumnDef::new("name", ColumnType::String { length: 80 })
                .with_modifier(ColumnModifier::Default(DefaultExpr::Literal(json!("it's"))))
                .with_modifier(ColumnModifier::NotNullable)
                .with_modifier(ColumnModifier::Unique)
                .with_modifier(ColumnModifier::Comment("Display name".into())),
        ));
        plan.push(TableOp::Column(
            ColumnDef::new("updated_at", ColumnType::DateTime)
                .with_modifier(ColumnModifier::Default(DefaultExpr::Now))
                .with_modifier(ColumnModifier::NotNullable),
        ));
        plan.push(TableOp::Index {
            columns: vec!["name".into(), "updated_at".into()],
            unique: false,
        });
        plan
    }

    #[test]
    fn test_render_table() {
        let statements = render_table(&person_plan());
        assert_eq!(
            statements,
            vec![
                "create table `person` (\
                 `id` int unsigned not null auto_increment primary key, \
                 `name` varchar(80) default 'it''s' not null comment 'Display name', \
                 `updated_at` datetime default CURRENT_TIMESTAMP not null)"
                    .to_string(),
                "alter table `person` add index \
                 `person_name_updated_at_index`(`name`, `updated_at`)"
                    .to_string(),
                "alter table `person` add unique `person_name_unique`(`name`)".to_string(),
            ]
        );
    }

    #[test]
    fn test_render_table_skips_repeated_index() {
        let mut plan = TablePlan::new("tag");
        plan.push(TableOp::Column(
            ColumnDef::new("label", ColumnType::String { length: 255 })
                .with_modifier(ColumnModifier::Index)
                .with_modifier(ColumnModifier::Unique),
        ));
        plan.push(TableOp::Index {
            columns: vec!["label".into()],
            unique: false,
        });
        plan.push(TableOp::Index {
            columns: vec!["label".into()],
            unique: true,
        });

        assert_eq!(
            render_table(&plan)[1..],
            [
                "alter table `tag` add index `tag_label_index`(`label`)".to_string(),
                "alter table `tag` add unique `tag_label_unique`(`label`)".to_string(),
            ]
        );
    }

    #[test]
    fn test_render_composite_primary() {
        let mut plan = TablePlan::new("review");
        for name in ["criticId", "movieId"] {
            plan.push(TableOp::Column(
                ColumnDef::new(name, ColumnType::Integer)
                    .with_modifier(ColumnModifier::Unsigned)
                    .with_modifier(ColumnModifier::NotNullable),
            ));
        }
        plan.push(TableOp::CompositePrimary {
            columns: vec!["criticId".into(), "movieId".into()],
        });

        assert_eq!(
            render_table(&plan)[0],
            "create table `review` (\
             `criticId` int unsigned not null, `movieId` int unsigned not null, \
             constraint `review_pkey` primary key (`criticId`, `movieId`))"
        );
    }

    #[test]
    fn test_render_types() {
        assert_eq!(
            render_column(&ColumnDef::new(
                "mood",
                ColumnType::Enum { values: vec!["happy".into(), "sad".into()] }
            )),
            "`mood` enum('happy', 'sad')"
        );
        assert_eq!(
            render_column(&ColumnDef::new("flag", ColumnType::Boolean).with_modifier(
                ColumnModifier::Default(DefaultExpr::Literal(json!(true)))
            )),
            "`flag` boolean default '1'"
        );
        assert_eq!(
            render_column(
                &ColumnDef::new("ratio", ColumnType::Float).with_modifier(ColumnModifier::Nullable)
            ),
            "`ratio` float(8, 2) null"
        );
    }

    #[test]
    fn test_render_foreign_key() {
        let op = ForeignKeyOp::new("order", "customerId", "customer", "id");
        assert_eq!(
            render_foreign_key(&op),
            "alter table `order` add constraint `order_customerId_foreign` \
             foreign key (`customerId`) references `customer` (`id`)"
        );
        assert!(render_foreign_key(&op.with_cascade(true)).ends_with(" on delete cascade"));
    }

    #[tokio::test]
    async fn test_driver_rejects_bad_order() {
        let mut driver = SqlScriptDriver::new();
        let fk = ForeignKeyOp::new("order", "customerId", "customer", "id");

        assert!(driver.add_foreign_key(&fk).await.is_err());

        driver.create_table(&TablePlan::new("customer")).await.unwrap();
        assert!(driver.create_table(&TablePlan::new("customer")).await.is_err());
        driver.create_table(&TablePlan::new("order")).await.unwrap();
        driver.add_foreign_key(&fk).await.unwrap();

        assert_eq!(driver.statements().len(), 3);
        assert!(driver.script().ends_with("references `customer` (`id`);\n"));
    }
}
