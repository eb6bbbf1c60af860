//! Diff execution: count, iterate and format differing rows
//!
//! Every terminal call synthesizes the query afresh and makes a single round
//! trip to the database. Nothing is cached between calls and records are
//! handed out one at a time, never collected.

use crate::config::ComparisonConfig;
use crate::connection::{Database, Visit};
use crate::decode::{DiffRecord, ResultDecoder};
use crate::error::Result;
use crate::output::{Formatter, PrettyFormatter};
use crate::sql::{SqlSynthesizer, SynthesizedQuery};
use std::io::Write;

/// Runs one comparison configuration against a database
pub struct DiffEngine<'db, D: Database + ?Sized> {
    database: &'db D,
    config: ComparisonConfig,
}

impl<'db, D: Database + ?Sized> DiffEngine<'db, D> {
    pub fn new(database: &'db D, config: ComparisonConfig) -> Self {
        Self { database, config }
    }

    pub fn config(&self) -> &ComparisonConfig {
        &self.config
    }

    /// The statement and bindings the terminal calls execute
    pub fn sql(&self) -> SynthesizedQuery {
        SqlSynthesizer::new(&self.config).synthesize()
    }

    /// Number of rows matching the SQL-level difference predicate
    ///
    /// Fuzzy matching and the result cap are not applied, so this can be
    /// larger than what [`each`](Self::each) reports.
    pub fn count(&self) -> Result<u64> {
        let query = self.sql();
        log::debug!("Counting differences:\n{}", query.count_sql());
        let count = self.database.query_count(&query.count_sql(), &query.params)?;
        log::info!(
            "{} candidate rows differ between {} and {}",
            count,
            self.config.source(),
            self.config.destination()
        );
        Ok(count)
    }

    /// Call `callback` for every differing record
    ///
    /// The callback may return `()` to keep going, or `false` /
    /// [`Visit::Stop`] to halt. Returns the number of records delivered,
    /// including the one that halted iteration.
    pub fn each<F, R>(&self, mut callback: F) -> Result<u64>
    where
        F: FnMut(&DiffRecord) -> R,
        R: Into<Visit>,
    {
        self.try_each(|record| Ok(callback(record).into()))
    }

    /// Like [`each`](Self::each) with a fallible callback; the first error
    /// ends iteration and is returned unchanged
    pub fn try_each<F>(&self, mut callback: F) -> Result<u64>
    where
        F: FnMut(&DiffRecord) -> Result<Visit>,
    {
        let query = self.sql();
        let decoder = ResultDecoder::new(&self.config, &query.projections);
        let columns = query.column_names();
        let max_results = self.config.max_results();

        log::debug!(
            "Running difference query with {} bound parameters:\n{}",
            query.params.len(),
            query.sql
        );

        let mut delivered = 0u64;
        let mut suppressed = 0u64;
        self.database
            .for_each_row(&query.sql, &query.params, &columns, &mut |raw| {
                let Some(record) = decoder.decode(raw)? else {
                    suppressed += 1;
                    return Ok(Visit::Continue);
                };

                let visit = callback(&record)?;
                delivered += 1;

                if visit == Visit::Stop {
                    log::debug!("Iteration stopped by callback after {} records", delivered);
                    return Ok(Visit::Stop);
                }
                if max_results > 0 && delivered >= max_results {
                    log::debug!("Result cap of {} reached", max_results);
                    return Ok(Visit::Stop);
                }
                Ok(Visit::Continue)
            })?;

        log::info!(
            "{} differing rows reported, {} suppressed by fuzzy matching",
            delivered,
            suppressed
        );
        Ok(delivered)
    }

    /// Format every record and print it to standard output
    pub fn output(&self) -> Result<u64> {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        self.output_with(|text| {
            writeln!(lock, "{}", text)?;
            Ok(())
        })
    }

    /// Format every record and pass the text to `handler`
    ///
    /// The formatter's header, if any, is passed first.
    pub fn output_with<H>(&self, mut handler: H) -> Result<u64>
    where
        H: FnMut(&str) -> Result<()>,
    {
        let default_formatter = PrettyFormatter;
        let formatter: &dyn Formatter = match self.config.formatter() {
            Some(formatter) => formatter.as_ref(),
            None => &default_formatter,
        };

        let source_table = self.config.source().to_string();
        let dest_table = self.config.destination().to_string();

        if let Some(header) = formatter.header(&source_table, &dest_table) {
            if !header.is_empty() {
                handler(&header)?;
            }
        }

        self.try_each(|record| {
            let text = formatter.format(record, &source_table, &dest_table)?;
            handler(&text)?;
            Ok(Visit::Continue)
        })
    }
}
