//! Output formatters for compiled schemas.

use clap::ValueEnum;
use comfy_table::{Cell, Table};
use tablegen_core::CompiledSchema;

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// MySQL DDL script
    Sql,
    /// JSON of the plan and model descriptors
    Json,
    /// Per-table summary
    Table,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Sql => write!(f, "sql"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Table => write!(f, "table"),
        }
    }
}

/// Format a compiled schema as pretty JSON.
pub fn format_json(compiled: &CompiledSchema) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(compiled)
}

/// Format a compiled schema as a table with one row per table.
pub fn format_summary(compiled: &CompiledSchema) -> String {
    let mut table = Table::new();
    table.set_header(vec![
        "Table",
        "Model",
        "Key",
        "Columns",
        "Relations",
        "Foreign keys",
    ]);

    for model in &compiled.models {
        let columns = compiled
            .plan
            .table(&model.table_name)
            .map(|plan| plan.columns().count())
            .unwrap_or(0);
        let foreign_keys = compiled.plan.foreign_keys_of(&model.table_name);

        table.add_row(vec![
            Cell::new(&model.table_name),
            Cell::new(&model.model_name),
            Cell::new(model.id_columns.join(", ")),
            Cell::new(columns),
            Cell::new(model.relations.keys().cloned().collect::<Vec<_>>().join(", ")),
            Cell::new(
                foreign_keys
                    .iter()
                    .map(|fk| {
                        format!(
                            "{} -> {}.{}",
                            fk.column, fk.references_table, fk.references_column
                        )
                    })
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
        ]);
    }

    format!(
        "{}\n{} table(s), {} operation(s)",
        table,
        compiled.models.len(),
        compiled.plan.op_count()
    )
}
