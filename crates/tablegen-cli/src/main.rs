//! Tablegen Command-Line Compiler
//!
//! Compiles a project document into a MySQL script, JSON descriptors or a
//! summary table.

mod formatter;

use clap::Parser;
use formatter::OutputFormat;
use std::path::{Path, PathBuf};
use tablegen_core::config::{DEFAULT_CREATED_COLUMN, DEFAULT_KEY_COLUMN, DEFAULT_UPDATED_COLUMN};
use tablegen_core::{
    apply, CompiledSchema, Compiler, CompilerConfig, FileFragmentResolver, SchemaSource,
    SqlScriptDriver,
};
use thiserror::Error;

/// Tablegen schema compiler
#[derive(Parser, Debug)]
#[command(name = "tablegen")]
#[command(version, about = "Compile table definitions into DDL and model descriptors")]
pub struct Args {
    /// Project document (JSON).
    #[arg(short, long)]
    pub project: PathBuf,

    /// Directory schema fragments are resolved against. Defaults to the
    /// project document's directory.
    #[arg(long)]
    pub schema_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "sql", value_enum)]
    pub format: OutputFormat,

    /// Write the output to a file instead of stdout.
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Update-time column name.
    #[arg(long, default_value = DEFAULT_UPDATED_COLUMN)]
    pub updated_column: String,

    /// Create-time column name.
    #[arg(long, default_value = DEFAULT_CREATED_COLUMN)]
    pub created_column: String,

    /// Key column added to tables without a primary field.
    #[arg(long, default_value = DEFAULT_KEY_COLUMN)]
    pub key_column: String,
}

/// Resolved run settings.
#[derive(Debug)]
pub struct RunConfig {
    /// Project document path.
    pub project: PathBuf,
    /// Root of the fragment resolver.
    pub schema_dir: PathBuf,
    /// Output format.
    pub format: OutputFormat,
    /// Output file; stdout when unset.
    pub out: Option<PathBuf>,
    /// Compiler settings.
    pub compiler: CompilerConfig,
}

impl Args {
    /// Convert command-line arguments to run settings.
    pub fn into_config(self) -> RunConfig {
        let schema_dir = self.schema_dir.unwrap_or_else(|| {
            self.project
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default()
        });

        let compiler = CompilerConfig::new()
            .with_key_column(self.key_column)
            .with_timestamps(self.updated_column, self.created_column);

        RunConfig {
            project: self.project,
            schema_dir,
            format: self.format,
            out: self.out,
            compiler,
        }
    }
}

/// Errors reported by the command.
#[derive(Debug, Error)]
pub enum CliError {
    /// A file could not be read or written.
    #[error("{path}: {source}")]
    Io {
        /// The file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Compilation failed.
    #[error(transparent)]
    Compile(#[from] tablegen_core::Error),

    /// JSON output failed.
    #[error("failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tablegen=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Args::parse().into_config();

    if let Err(e) = run(config).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: RunConfig) -> Result<(), CliError> {
    let json = tokio::fs::read_to_string(&config.project)
        .await
        .map_err(|source| CliError::Io {
            path: config.project.clone(),
            source,
        })?;
    let source = SchemaSource::from_json(&json)?;

    tracing::info!(
        project = %config.project.display(),
        schema_dir = %config.schema_dir.display(),
        tables = source.tables().len(),
        "project loaded"
    );

    let compiler = Compiler::new(FileFragmentResolver::new(&config.schema_dir), config.compiler);
    let compiled = compiler.compile(&source).await?;
    let output = render(&compiled, config.format).await?;

    match &config.out {
        Some(path) => tokio::fs::write(path, output)
            .await
            .map_err(|source| CliError::Io {
                path: path.clone(),
                source,
            })?,
        None => println!("{}", output.trim_end()),
    }

    Ok(())
}

async fn render(compiled: &CompiledSchema, format: OutputFormat) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Sql => {
            let mut driver = SqlScriptDriver::new();
            apply(&compiled.plan, &mut driver).await?;
            driver.script()
        }
        OutputFormat::Json => formatter::format_json(compiled)?,
        OutputFormat::Table => formatter::format_summary(compiled),
    })
}
