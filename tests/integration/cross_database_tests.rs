//! Comparisons spanning separate database files, including the CLI path

use crate::common::{id_set, seed_database_file, TestFixture};
use clap::Parser;
use rowdiff::cli::Cli;
use rowdiff::commands::{build_config, execute_command, open_database};
use rowdiff::sql::{AliasMap, Side};
use rowdiff::{ComparisonBuilder, DiffEngine, TableRef};
use std::collections::BTreeSet;

#[test]
fn test_same_table_name_in_two_databases_gets_two_tokens() {
    let aliases = AliasMap::new(
        &TableRef::in_database("backup", "products"),
        &TableRef::in_database("live", "products"),
    );
    assert_ne!(aliases.token(Side::Source), aliases.token(Side::Destination));
}

#[test]
fn test_main_database_against_attached_database() {
    let fixture = TestFixture::new().unwrap();
    fixture
        .execute(
            "CREATE TABLE products (id INTEGER, name VARCHAR);
             CREATE TABLE live.products (id INTEGER, name VARCHAR);
             INSERT INTO products VALUES (1, 'a'), (2, 'b');
             INSERT INTO live.products VALUES (1, 'a'), (2, 'c');",
        )
        .unwrap();

    let records = fixture
        .records(
            ComparisonBuilder::new()
                .source(TableRef::new("products"))
                .destination_in("live", "products")
                .columns(["name"]),
        )
        .unwrap();
    assert_eq!(id_set(&records), BTreeSet::from([2]));
}

fn seed_pair(dir: &std::path::Path) -> (String, String) {
    let backup = seed_database_file(
        dir,
        "backup.duckdb",
        "CREATE TABLE products (id INTEGER, name VARCHAR, price INTEGER);
         INSERT INTO products VALUES (1, 'Widget', 10), (2, 'Gadget', 20), (3, 'Bolt', 1);",
    )
    .unwrap();
    let live = seed_database_file(
        dir,
        "live.duckdb",
        "CREATE TABLE products (id INTEGER, name VARCHAR, price INTEGER);
         INSERT INTO products VALUES (1, 'Widget', 10), (2, 'Gadget', 22), (4, 'Nut', 2);",
    )
    .unwrap();
    (
        format!("backup={}", backup.display()),
        format!("live={}", live.display()),
    )
}

#[test]
fn test_cli_arguments_drive_engine() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let (backup, live) = seed_pair(temp_dir.path());

    let cli = Cli::try_parse_from([
        "rowdiff", "diff",
        "--attach", backup.as_str(),
        "--attach", live.as_str(),
        "--source", "backup.products",
        "--dest", "live.products",
        "--columns", "name,price",
    ])
    .unwrap();

    let rowdiff::cli::Commands::Diff {
        connection,
        comparison,
        ..
    } = cli.command
    else {
        panic!("Expected Diff command");
    };

    let database = open_database(&connection).unwrap();
    let engine = DiffEngine::new(&database, build_config(&comparison, None).unwrap());

    let mut records = Vec::new();
    engine.each(|record| records.push(record.clone())).unwrap();
    assert_eq!(id_set(&records), BTreeSet::from([2, 3, 4]));
    assert_eq!(engine.count().unwrap(), 3);
}

#[test]
fn test_cli_commands_execute() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let (backup, live) = seed_pair(temp_dir.path());

    for subcommand in [vec!["count"], vec!["diff", "--format", "json"], vec!["sql"]] {
        let mut args = vec!["rowdiff"];
        args.extend(subcommand.iter().copied());
        if subcommand[0] != "sql" {
            args.extend(["--attach", backup.as_str(), "--attach", live.as_str()]);
        }
        args.extend([
            "--source", "backup.products",
            "--dest", "live.products",
            "--columns", "name,price",
        ]);

        let cli = Cli::try_parse_from(args).unwrap();
        execute_command(&cli).unwrap();
    }
}

#[test]
fn test_cli_reports_unknown_table() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let (backup, live) = seed_pair(temp_dir.path());

    let cli = Cli::try_parse_from([
        "rowdiff", "count",
        "--attach", backup.as_str(),
        "--attach", live.as_str(),
        "--source", "backup.missing",
        "--dest", "live.products",
        "--columns", "name",
    ])
    .unwrap();
    assert!(execute_command(&cli).is_err());
}

fn diff_ids_with_where(dir: &std::path::Path, constraint: &str) -> BTreeSet<i64> {
    let backup = seed_database_file(
        dir,
        "backup_codes.duckdb",
        "CREATE TABLE parts (id INTEGER, code VARCHAR, qty INTEGER);
         INSERT INTO parts VALUES (1, '007', 1), (2, 'abc', 1), (3, '7', 5);",
    )
    .unwrap();
    let live = seed_database_file(
        dir,
        "live_codes.duckdb",
        "CREATE TABLE parts (id INTEGER, code VARCHAR, qty INTEGER);
         INSERT INTO parts VALUES (1, '007', 2), (2, 'abc', 2), (3, '7', 7);",
    )
    .unwrap();
    let backup = format!("backup={}", backup.display());
    let live = format!("live={}", live.display());

    let cli = Cli::try_parse_from([
        "rowdiff", "diff",
        "--attach", backup.as_str(),
        "--attach", live.as_str(),
        "--source", "backup.parts",
        "--dest", "live.parts",
        "--columns", "qty",
        "--where", constraint,
    ])
    .unwrap();
    let rowdiff::cli::Commands::Diff {
        connection,
        comparison,
        ..
    } = cli.command
    else {
        panic!("Expected Diff command");
    };

    let database = open_database(&connection).unwrap();
    let engine = DiffEngine::new(&database, build_config(&comparison, None).unwrap());
    let mut records = Vec::new();
    engine.each(|record| records.push(record.clone())).unwrap();
    id_set(&records)
}

#[test]
fn test_cli_where_on_text_column_keeps_leading_zeros() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    assert_eq!(
        diff_ids_with_where(temp_dir.path(), "code=007"),
        BTreeSet::from([1])
    );
}

#[test]
fn test_cli_where_on_integer_column() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    assert_eq!(
        diff_ids_with_where(temp_dir.path(), "qty=7"),
        BTreeSet::from([3])
    );
}
