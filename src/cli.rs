//! Command-line interface for rowdiff

use crate::connection::AttachKind;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rowdiff")]
#[command(about = "Row-level diff between two tables correlated by primary key")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print every differing row
    Diff {
        #[command(flatten)]
        connection: ConnectionArgs,

        #[command(flatten)]
        comparison: ComparisonArgs,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },

    /// Count rows that differ at the SQL level (ignores fuzzy matching and --max)
    Count {
        #[command(flatten)]
        connection: ConnectionArgs,

        #[command(flatten)]
        comparison: ComparisonArgs,
    },

    /// Print the generated difference query without running it
    Sql {
        #[command(flatten)]
        comparison: ComparisonArgs,
    },
}

/// Where the tables live
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// DuckDB database file to open (in-memory when omitted)
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Attach a database read-only: ALIAS=[TYPE:]TARGET, TYPE one of duckdb, sqlite, postgres, mysql
    #[arg(long = "attach", value_parser = AttachSpec::parse)]
    pub attach: Vec<AttachSpec>,
}

/// What to compare and how
#[derive(Args, Debug, Clone)]
pub struct ComparisonArgs {
    /// Source table: TABLE or DATABASE.TABLE
    #[arg(long)]
    pub source: String,

    /// Destination table: TABLE or DATABASE.TABLE
    #[arg(long)]
    pub dest: String,

    /// Comma-separated columns to compare (primary key excluded)
    #[arg(long, value_delimiter = ',', required = true)]
    pub columns: Vec<String>,

    /// Primary key column
    #[arg(long, default_value = crate::DEFAULT_PRIMARY_KEY)]
    pub primary_key: String,

    /// Only rows where COLUMN equals VALUE on either side: COLUMN=VALUE
    /// (VALUE is passed as text and cast to the column's type)
    #[arg(long = "where", value_parser = parse_key_value)]
    pub constraints: Vec<(String, String)>,

    /// Stop after this many differing rows (0 = unlimited)
    #[arg(long, default_value = "0")]
    pub max: u64,

    /// Normalizers applied before comparing: COLUMN=NAME[,NAME...]
    #[arg(long = "normalize", value_parser = parse_key_value)]
    pub normalizers: Vec<(String, String)>,

    /// Relaxed comparator for a column: COLUMN=strict|case-insensitive|tolerance:EPS
    #[arg(long = "compare", value_parser = parse_key_value)]
    pub comparators: Vec<(String, String)>,

    /// Treat NULL against a value as a difference in SQL
    #[arg(long)]
    pub null_safe: bool,
}

/// A database to attach before running the comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachSpec {
    pub alias: String,
    pub kind: AttachKind,
    pub target: String,
}

impl AttachSpec {
    pub fn parse(s: &str) -> Result<Self, String> {
        let (alias, rest) = parse_key_value(s)?;
        let (kind, target) = match rest.split_once(':') {
            Some((prefix, target)) => match AttachKind::parse(prefix) {
                Ok(kind) => (kind, target.to_string()),
                Err(_) => (AttachKind::DuckDb, rest.clone()),
            },
            None => (AttachKind::DuckDb, rest.clone()),
        };

        if target.is_empty() {
            return Err(format!("Missing attach target in '{}'", s));
        }

        Ok(Self {
            alias,
            kind,
            target,
        })
    }
}

/// Split `KEY=VALUE`, requiring a non-empty key
fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Expected KEY=VALUE, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("Missing key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}
