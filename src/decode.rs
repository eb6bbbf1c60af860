//! Decoding of result rows into diff records

use crate::config::ComparisonConfig;
use crate::error::{Result, RowdiffError};
use crate::fuzzy::FuzzyMatcher;
use crate::sql::{ColumnRole, Projection, Side};
use crate::value::{Row, Value};
use indexmap::IndexMap;
use serde::Serialize;

/// One raw result row as returned by the database: alias → value
pub type RawRow = IndexMap<String, Value>;

/// The difference found for one primary key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffRecord {
    pub id: Value,
    pub source_exists: bool,
    pub dest_exists: bool,
    /// Source values that differ from the destination; `None` when the source row is missing
    pub source_diff: Option<Row>,
    /// Destination values that differ from the source; `None` when the destination row is missing
    pub dest_diff: Option<Row>,
    /// All compared columns of the source row; empty when it is missing
    pub source_row: Row,
    /// All compared columns of the destination row; empty when it is missing
    pub dest_row: Row,
}

impl DiffRecord {
    pub fn is_missing_in_source(&self) -> bool {
        !self.source_exists
    }

    pub fn is_missing_in_destination(&self) -> bool {
        !self.dest_exists
    }

    pub fn diff(&self, side: Side) -> Option<&Row> {
        match side {
            Side::Source => self.source_diff.as_ref(),
            Side::Destination => self.dest_diff.as_ref(),
        }
    }

    pub fn row(&self, side: Side) -> &Row {
        match side {
            Side::Source => &self.source_row,
            Side::Destination => &self.dest_row,
        }
    }
}

/// Entries of `row` whose value does not identically match the same key in `other`
pub fn row_difference(row: &Row, other: &Row) -> Row {
    row.iter()
        .filter(|(column, value)| other.get(column.as_str()) != Some(*value))
        .map(|(column, value)| (column.clone(), value.clone()))
        .collect()
}

/// Turns raw result rows into [`DiffRecord`]s, routing each projected
/// column by its tagged role rather than by parsing its alias
pub struct ResultDecoder<'a> {
    config: &'a ComparisonConfig,
    projections: &'a [Projection],
}

impl<'a> ResultDecoder<'a> {
    pub fn new(config: &'a ComparisonConfig, projections: &'a [Projection]) -> Self {
        Self {
            config,
            projections,
        }
    }

    /// Decode one row; `Ok(None)` means fuzzy matching found no difference
    pub fn decode(&self, mut raw: RawRow) -> Result<Option<DiffRecord>> {
        let mut id = None;
        let mut source_exists = false;
        let mut dest_exists = false;
        let mut source_values = Row::new();
        let mut dest_values = Row::new();

        for projection in self.projections {
            let value = raw.shift_remove(&projection.alias).ok_or_else(|| {
                RowdiffError::data_shape(format!(
                    "result row is missing column '{}'",
                    projection.alias
                ))
            })?;

            match &projection.role {
                ColumnRole::Key => id = Some(value),
                ColumnRole::Presence(Side::Source) => source_exists = !value.is_null(),
                ColumnRole::Presence(Side::Destination) => dest_exists = !value.is_null(),
                ColumnRole::Value(Side::Source, column) => {
                    source_values.insert(column.clone(), value);
                }
                ColumnRole::Value(Side::Destination, column) => {
                    dest_values.insert(column.clone(), value);
                }
            }
        }

        if let Some(extra) = raw.keys().next() {
            return Err(RowdiffError::data_shape(format!(
                "result row has unexpected column '{}'",
                extra
            )));
        }

        let id = id.ok_or_else(|| {
            RowdiffError::data_shape(format!(
                "result row has no '{}' key column",
                self.config.primary_key()
            ))
        })?;

        if !source_exists && !dest_exists {
            return Err(RowdiffError::data_shape(format!(
                "row {} exists on neither side",
                id
            )));
        }

        let source_row = if source_exists { source_values } else { Row::new() };
        let dest_row = if dest_exists { dest_values } else { Row::new() };

        let mut source_diff = source_exists.then(|| row_difference(&source_row, &dest_row));
        let mut dest_diff = dest_exists.then(|| row_difference(&dest_row, &source_row));

        if let (Some(source), Some(dest)) = (source_diff.as_mut(), dest_diff.as_mut()) {
            let matcher = FuzzyMatcher::new(self.config.normalizers(), self.config.comparators());
            if matcher.is_active() {
                matcher.apply(source, dest);
                if source.is_empty() && dest.is_empty() {
                    log::trace!("row {} suppressed by fuzzy matching", id);
                    return Ok(None);
                }
            }
        }

        Ok(Some(DiffRecord {
            id,
            source_exists,
            dest_exists,
            source_diff,
            dest_diff,
            source_row,
            dest_row,
        }))
    }
}
