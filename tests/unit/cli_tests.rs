//! Unit tests for CLI argument parsing and config assembly

use clap::Parser;
use rowdiff::cli::{Cli, Commands};
use rowdiff::commands::build_config;
use rowdiff::connection::AttachKind;
use rowdiff::{TableRef, Value};

#[test]
fn test_cli_diff_command() {
    let cli = Cli::try_parse_from([
        "rowdiff", "diff",
        "--attach", "backup=backup.duckdb",
        "--attach", "live=sqlite:live.db",
        "--source", "backup.products",
        "--dest", "live.products",
        "--columns", "name,price",
    ])
    .unwrap();

    match cli.command {
        Commands::Diff {
            connection,
            comparison,
            format,
        } => {
            assert!(connection.database.is_none());
            assert_eq!(connection.attach.len(), 2);
            assert_eq!(connection.attach[1].kind, AttachKind::Sqlite);
            assert_eq!(comparison.columns, vec!["name", "price"]);
            assert_eq!(comparison.primary_key, "id");
            assert_eq!(comparison.max, 0);
            assert_eq!(format, "pretty");
        }
        _ => panic!("Expected Diff command"),
    }
}

#[test]
fn test_cli_requires_columns() {
    let result = Cli::try_parse_from([
        "rowdiff", "count", "--source", "a", "--dest", "b",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_cli_rejects_bad_key_value() {
    let result = Cli::try_parse_from([
        "rowdiff", "sql", "--source", "a", "--dest", "b", "--columns", "x", "--where", "vendor",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_build_config_from_arguments() {
    let cli = Cli::try_parse_from([
        "rowdiff", "sql",
        "--source", "backup.products",
        "--dest", "products",
        "--columns", "name, price",
        "--primary-key", "sku",
        "--where", "vendor=Acme",
        "--where", "region=7",
        "--max", "25",
        "--normalize", "name=trim,lowercase",
        "--compare", "price=tolerance:0.5",
        "--null-safe",
    ])
    .unwrap();

    let Commands::Sql { comparison } = cli.command else {
        panic!("Expected Sql command");
    };
    let config = build_config(&comparison, None).unwrap();

    assert_eq!(config.source(), &TableRef::in_database("backup", "products"));
    assert_eq!(config.destination(), &TableRef::new("products"));
    assert_eq!(config.columns(), ["name", "price"]);
    assert_eq!(config.primary_key(), "sku");
    assert_eq!(config.max_results(), 25);
    assert_eq!(config.constraints()["vendor"], Value::Text("Acme".into()));
    assert_eq!(config.constraints()["region"], Value::Text("7".into()));
    assert_eq!(config.normalizers()["name"].len(), 2);
    assert!(config.comparators().contains_key("price"));
    assert!(config.null_safe());
}

#[test]
fn test_build_config_rejects_unknown_normalizer() {
    let cli = Cli::try_parse_from([
        "rowdiff", "sql", "--source", "a", "--dest", "b", "--columns", "x",
        "--normalize", "x=soundex",
    ])
    .unwrap();
    let Commands::Sql { comparison } = cli.command else {
        panic!("Expected Sql command");
    };
    assert!(build_config(&comparison, None).is_err());
}

#[test]
fn test_build_config_rejects_primary_key_column() {
    let cli = Cli::try_parse_from([
        "rowdiff", "sql", "--source", "a", "--dest", "b", "--columns", "id,name",
    ])
    .unwrap();
    let Commands::Sql { comparison } = cli.command else {
        panic!("Expected Sql command");
    };
    assert!(build_config(&comparison, None).is_err());
}
