//! Database access: the collaborator trait and its DuckDB implementation
//!
//! DuckDB hosts both sides of a comparison. Additional databases (DuckDB
//! files, SQLite files, Postgres or MySQL servers) are attached under an
//! alias and addressed as `alias.table`.

use crate::error::{Result, RowdiffError};
use crate::sql::quote_ident;
use crate::value::Value;
use crate::decode::RawRow;
use duckdb::{params_from_iter, Connection};
use std::env;
use std::path::Path;

/// Whether row iteration should go on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Continue,
    Stop,
}

impl From<()> for Visit {
    fn from(_: ()) -> Self {
        Visit::Continue
    }
}

impl From<bool> for Visit {
    fn from(keep_going: bool) -> Self {
        if keep_going {
            Visit::Continue
        } else {
            Visit::Stop
        }
    }
}

/// What the engine needs from a database
pub trait Database {
    /// Run `sql` with positional `params` and hand every row to `visit` as
    /// soon as it is read. `columns` names the result columns in order.
    /// Stops pulling rows once `visit` returns [`Visit::Stop`].
    fn for_each_row(
        &self,
        sql: &str,
        params: &[Value],
        columns: &[&str],
        visit: &mut dyn FnMut(RawRow) -> Result<Visit>,
    ) -> Result<()>;

    /// Run a query returning a single count
    fn query_count(&self, sql: &str, params: &[Value]) -> Result<u64>;
}

/// Storage engine of an attached database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachKind {
    DuckDb,
    Sqlite,
    Postgres,
    MySql,
}

impl AttachKind {
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        match s.to_lowercase().as_str() {
            "duckdb" => Ok(Self::DuckDb),
            "sqlite" => Ok(Self::Sqlite),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "mysql" => Ok(Self::MySql),
            _ => Err(format!(
                "Invalid database type: {}. Use 'duckdb', 'sqlite', 'postgres' or 'mysql'",
                s
            )),
        }
    }

    fn type_clause(self) -> Option<&'static str> {
        match self {
            Self::DuckDb => None,
            Self::Sqlite => Some("sqlite"),
            Self::Postgres => Some("postgres"),
            Self::MySql => Some("mysql"),
        }
    }
}

/// DuckDB-backed [`Database`]
pub struct DuckDbDatabase {
    connection: Connection,
}

impl DuckDbDatabase {
    pub fn open_in_memory() -> Result<Self> {
        Self::configure(Connection::open_in_memory()?)
    }

    pub fn open(path: &Path) -> Result<Self> {
        let connection = Connection::open(path).map_err(|e| {
            RowdiffError::invalid_input(format!(
                "Failed to open database '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::configure(connection)
    }

    fn configure(connection: Connection) -> Result<Self> {
        connection.execute_batch("SET enable_progress_bar=false")?;
        Ok(Self { connection })
    }

    /// Attach another database under `alias`
    ///
    /// `{VAR}` placeholders in `target` are replaced from the environment so
    /// credentials can stay out of command lines.
    pub fn attach(&self, target: &str, alias: &str, kind: AttachKind, read_only: bool) -> Result<()> {
        let target = substitute_env_vars(target)?;

        let mut options = Vec::new();
        if let Some(type_name) = kind.type_clause() {
            self.connection
                .execute_batch(&format!("INSTALL {0}; LOAD {0};", type_name))?;
            options.push(format!("TYPE {}", type_name));
        }
        if read_only {
            options.push("READ_ONLY".to_string());
        }

        let mut sql = format!(
            "ATTACH '{}' AS {}",
            target.replace('\'', "''"),
            quote_ident(alias)
        );
        if !options.is_empty() {
            sql.push_str(&format!(" ({})", options.join(", ")));
        }

        log::debug!("Attaching {:?} database as {}", kind, alias);
        self.connection.execute_batch(&sql)?;
        Ok(())
    }

    /// Run setup statements (DDL, inserts) separated by semicolons
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.connection.execute_batch(sql)?;
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }
}

impl Database for DuckDbDatabase {
    fn for_each_row(
        &self,
        sql: &str,
        params: &[Value],
        columns: &[&str],
        visit: &mut dyn FnMut(RawRow) -> Result<Visit>,
    ) -> Result<()> {
        let bound: Vec<duckdb::types::Value> = params.iter().map(Into::into).collect();
        let mut stmt = self.connection.prepare(sql)?;

        // Streaming execution: chunks are fetched only as the cursor advances
        drop(stmt.stream_arrow(params_from_iter(bound))?);
        check_result_columns(&stmt.column_names(), columns)?;

        let mut rows = stmt.raw_query();
        while let Some(row) = rows.next()? {
            let mut raw = RawRow::with_capacity(columns.len());
            for (index, name) in columns.iter().enumerate() {
                let value = row.get_ref(index).map_err(|e| {
                    RowdiffError::data_shape(format!(
                        "cannot read result column {} ('{}'): {}",
                        index, name, e
                    ))
                })?;
                raw.insert((*name).to_string(), Value::from_duckdb(value));
            }

            if visit(raw)? == Visit::Stop {
                break;
            }
        }

        Ok(())
    }

    fn query_count(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let bound: Vec<duckdb::types::Value> = params.iter().map(Into::into).collect();
        let count: i64 = self
            .connection
            .prepare(sql)?
            .query_row(params_from_iter(bound), |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RowdiffError::data_shape(format!("negative row count: {}", count)))
    }
}

/// The statement must return exactly the expected columns, in order
fn check_result_columns(actual: &[String], expected: &[&str]) -> Result<()> {
    if actual.len() != expected.len() {
        return Err(RowdiffError::data_shape(format!(
            "query returned {} columns, expected {}",
            actual.len(),
            expected.len()
        )));
    }

    match actual.iter().zip(expected).position(|(a, e)| a != e) {
        Some(index) => Err(RowdiffError::data_shape(format!(
            "result column {} is '{}', expected '{}'",
            index, actual[index], expected[index]
        ))),
        None => Ok(()),
    }
}

/// Substitute `{VAR_NAME}` placeholders with environment variables
pub fn substitute_env_vars(input: &str) -> Result<String> {
    let mut result = input.to_string();

    let mut start = 0;
    while let Some(open_pos) = result[start..].find('{') {
        let open_pos = start + open_pos;
        if let Some(close_pos) = result[open_pos..].find('}') {
            let close_pos = open_pos + close_pos;
            let var_name = &result[open_pos + 1..close_pos];

            let var_value = env::var(var_name).map_err(|_| {
                RowdiffError::invalid_input(format!(
                    "Environment variable '{}' not found",
                    var_name
                ))
            })?;

            result.replace_range(open_pos..=close_pos, &var_value);
            start = open_pos + var_value.len();
        } else {
            start = open_pos + 1;
        }
    }

    Ok(result)
}
