//! Command implementations for rowdiff CLI

use crate::cli::{Cli, Commands, ComparisonArgs, ConnectionArgs};
use crate::config::{ComparisonBuilder, ComparisonConfig, TableRef};
use crate::connection::DuckDbDatabase;
use crate::engine::DiffEngine;
use crate::error::{Result, RowdiffError};
use crate::fuzzy::{comparator_by_spec, normalizer_by_name};
use crate::output::{Formatter, JsonFormatter, OutputFormat, PrettyFormatter};
use crate::value::Value;
use std::sync::Arc;

/// Execute a command
pub fn execute_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Diff {
            connection,
            comparison,
            format,
        } => diff_command(connection, comparison, format),
        Commands::Count {
            connection,
            comparison,
        } => count_command(connection, comparison),
        Commands::Sql { comparison } => sql_command(comparison),
    }
}

/// Print every differing row
fn diff_command(connection: &ConnectionArgs, comparison: &ComparisonArgs, format: &str) -> Result<()> {
    let format = OutputFormat::parse(format).map_err(|e| RowdiffError::invalid_input(e))?;
    let formatter: Arc<dyn Formatter> = match format {
        OutputFormat::Pretty => Arc::new(PrettyFormatter),
        OutputFormat::Json => Arc::new(JsonFormatter),
    };

    let config = build_config(comparison, Some(formatter))?;
    let database = open_database(connection)?;
    let engine = DiffEngine::new(&database, config);
    let count = engine.output()?;

    if format == OutputFormat::Pretty {
        if count == 0 {
            println!("✅ No differences");
        } else {
            println!("└─ {} differing rows", count);
        }
    }

    Ok(())
}

/// Print the SQL-level difference count
fn count_command(connection: &ConnectionArgs, comparison: &ComparisonArgs) -> Result<()> {
    let config = build_config(comparison, None)?;
    let database = open_database(connection)?;
    let count = DiffEngine::new(&database, config).count()?;
    println!("{}", count);
    Ok(())
}

/// Print the generated query and its bound parameters
fn sql_command(comparison: &ComparisonArgs) -> Result<()> {
    let config = build_config(comparison, None)?;
    let query = crate::sql::SqlSynthesizer::new(&config).synthesize();
    println!("{};", query.sql);
    if !query.params.is_empty() {
        let params: Vec<String> = query.params.iter().map(ToString::to_string).collect();
        println!("-- parameters: {}", params.join(", "));
    }
    Ok(())
}

/// Turn command-line comparison arguments into a validated configuration
pub fn build_config(
    args: &ComparisonArgs,
    formatter: Option<Arc<dyn Formatter>>,
) -> Result<ComparisonConfig> {
    let mut builder = ComparisonBuilder::new()
        .source(TableRef::parse(&args.source)?)
        .destination(TableRef::parse(&args.dest)?)
        .columns(args.columns.iter().map(|c| c.trim().to_string()))
        .primary_key(args.primary_key.trim())
        .max_results(args.max)
        .null_safe(args.null_safe);

    // Bound as text; DuckDB casts it to the column's type
    for (column, value) in &args.constraints {
        builder = builder.constraint(column.as_str(), Value::Text(value.clone()));
    }

    for (column, names) in &args.normalizers {
        for name in names.split(',').filter(|n| !n.trim().is_empty()) {
            builder = builder.normalizer(column.as_str(), normalizer_by_name(name)?);
        }
    }

    for (column, spec) in &args.comparators {
        builder = builder.comparator(column.as_str(), comparator_by_spec(spec)?);
    }

    if let Some(formatter) = formatter {
        builder = builder.formatter(formatter);
    }

    builder.build()
}

/// Open the main database and attach every requested one
pub fn open_database(args: &ConnectionArgs) -> Result<DuckDbDatabase> {
    let database = match &args.database {
        Some(path) => DuckDbDatabase::open(path)?,
        None => DuckDbDatabase::open_in_memory()?,
    };

    for spec in &args.attach {
        database.attach(&spec.target, &spec.alias, spec.kind, true)?;
    }

    Ok(database)
}
