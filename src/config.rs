//! Comparison configuration and its builder
//!
//! A [`ComparisonBuilder`] collects settings and produces an immutable
//! [`ComparisonConfig`]. Validation happens in [`ComparisonBuilder::build`],
//! so every config that reaches the engine can be turned into SQL.

use crate::error::{Result, RowdiffError};
use crate::fuzzy::{Comparator, ComparatorMap, Normalizer, NormalizerChain, NormalizerMap};
use crate::output::Formatter;
use crate::value::Value;
use crate::DEFAULT_PRIMARY_KEY;
use indexmap::{IndexMap, IndexSet};
use std::fmt;
use std::sync::Arc;

/// A table, optionally qualified by the database (catalog) that owns it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub database: Option<String>,
    pub name: String,
}

impl TableRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            database: None,
            name: name.into(),
        }
    }

    pub fn in_database(database: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            database: Some(database.into()),
            name: name.into(),
        }
    }

    /// Parse `table` or `database.table`
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let table = match raw.split_once('.') {
            Some((database, name)) => Self::in_database(database.trim(), name.trim()),
            None => Self::new(raw),
        };
        if table.name.is_empty() || table.database.as_deref() == Some("") {
            return Err(RowdiffError::invalid_input(format!(
                "Invalid table reference: '{}'. Use TABLE or DATABASE.TABLE",
                raw
            )));
        }
        Ok(table)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.database {
            Some(database) => write!(f, "{}.{}", database, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Validated, immutable comparison parameters
#[derive(Clone)]
pub struct ComparisonConfig {
    source: TableRef,
    destination: TableRef,
    columns: Vec<String>,
    primary_key: String,
    constraints: IndexMap<String, Value>,
    max_results: u64,
    normalizers: NormalizerMap,
    comparators: ComparatorMap,
    formatter: Option<Arc<dyn Formatter>>,
    null_safe: bool,
}

impl ComparisonConfig {
    pub fn builder() -> ComparisonBuilder {
        ComparisonBuilder::new()
    }

    pub fn source(&self) -> &TableRef {
        &self.source
    }

    pub fn destination(&self) -> &TableRef {
        &self.destination
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn constraints(&self) -> &IndexMap<String, Value> {
        &self.constraints
    }

    /// Maximum number of reported records; 0 means unlimited
    pub fn max_results(&self) -> u64 {
        self.max_results
    }

    pub fn normalizers(&self) -> &NormalizerMap {
        &self.normalizers
    }

    pub fn comparators(&self) -> &ComparatorMap {
        &self.comparators
    }

    pub fn formatter(&self) -> Option<&Arc<dyn Formatter>> {
        self.formatter.as_ref()
    }

    pub fn null_safe(&self) -> bool {
        self.null_safe
    }
}

impl fmt::Debug for ComparisonConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComparisonConfig")
            .field("source", &self.source)
            .field("destination", &self.destination)
            .field("columns", &self.columns)
            .field("primary_key", &self.primary_key)
            .field("constraints", &self.constraints)
            .field("max_results", &self.max_results)
            .field("normalizers", &self.normalizers.keys().collect::<Vec<_>>())
            .field("comparators", &self.comparators.keys().collect::<Vec<_>>())
            .field("null_safe", &self.null_safe)
            .finish()
    }
}

/// Chainable collector for [`ComparisonConfig`]
#[derive(Default)]
pub struct ComparisonBuilder {
    source: Option<TableRef>,
    destination: Option<TableRef>,
    columns: Vec<String>,
    primary_key: Option<String>,
    constraints: IndexMap<String, Value>,
    max_results: u64,
    normalizers: NormalizerMap,
    comparators: ComparatorMap,
    formatter: Option<Arc<dyn Formatter>>,
    null_safe: bool,
}

impl ComparisonBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the compared column list
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.columns.push(column.into());
        self
    }

    pub fn source(mut self, table: TableRef) -> Self {
        self.source = Some(table);
        self
    }

    pub fn source_in(self, database: impl Into<String>, table: impl Into<String>) -> Self {
        self.source(TableRef::in_database(database, table))
    }

    pub fn destination(mut self, table: TableRef) -> Self {
        self.destination = Some(table);
        self
    }

    pub fn destination_in(self, database: impl Into<String>, table: impl Into<String>) -> Self {
        self.destination(TableRef::in_database(database, table))
    }

    /// Admit only rows where `column` equals `value` on either side
    pub fn constraint(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.constraints.insert(column.into(), value.into());
        self
    }

    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = Some(column.into());
        self
    }

    pub fn max_results(mut self, max: u64) -> Self {
        self.max_results = max;
        self
    }

    pub fn formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    pub fn normalizers(mut self, normalizers: NormalizerMap) -> Self {
        self.normalizers = normalizers;
        self
    }

    /// Append a normalizer to the chain of `column`
    pub fn normalizer(mut self, column: impl Into<String>, normalizer: Arc<dyn Normalizer>) -> Self {
        self.normalizers
            .entry(column.into())
            .or_insert_with(NormalizerChain::new)
            .push(normalizer);
        self
    }

    pub fn comparators(mut self, comparators: ComparatorMap) -> Self {
        self.comparators = comparators;
        self
    }

    pub fn comparator(mut self, column: impl Into<String>, comparator: Arc<dyn Comparator>) -> Self {
        self.comparators.insert(column.into(), comparator);
        self
    }

    /// Compare with `IS DISTINCT FROM` so NULL against a value counts as a difference
    pub fn null_safe(mut self, null_safe: bool) -> Self {
        self.null_safe = null_safe;
        self
    }

    /// Validate and freeze the configuration
    pub fn build(self) -> Result<ComparisonConfig> {
        let source = self
            .source
            .ok_or_else(|| RowdiffError::config("source table is not set"))?;
        let destination = self
            .destination
            .ok_or_else(|| RowdiffError::config("destination table is not set"))?;

        if source == destination {
            return Err(RowdiffError::config(format!(
                "source and destination are the same table: {}",
                source
            )));
        }

        if self.columns.is_empty() {
            return Err(RowdiffError::config("no columns to compare"));
        }

        let primary_key = self
            .primary_key
            .unwrap_or_else(|| DEFAULT_PRIMARY_KEY.to_string());
        if primary_key.trim().is_empty() {
            return Err(RowdiffError::config("primary key column name is empty"));
        }

        let mut seen = IndexSet::new();
        for column in &self.columns {
            if column.trim().is_empty() {
                return Err(RowdiffError::config("compared column name is empty"));
            }
            if *column == primary_key {
                return Err(RowdiffError::config(format!(
                    "primary key '{}' cannot be one of the compared columns",
                    primary_key
                )));
            }
            if !seen.insert(column.as_str()) {
                return Err(RowdiffError::config(format!(
                    "column '{}' is listed more than once",
                    column
                )));
            }
        }

        Ok(ComparisonConfig {
            source,
            destination,
            columns: self.columns,
            primary_key,
            constraints: self.constraints,
            max_results: self.max_results,
            normalizers: self.normalizers,
            comparators: self.comparators,
            formatter: self.formatter,
            null_safe: self.null_safe,
        })
    }
}
