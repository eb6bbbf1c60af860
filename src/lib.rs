//! # rowdiff
//!
//! Row-level differences between two relational tables (possibly in
//! different databases) over a chosen set of columns, correlated by a
//! single-column primary key.
//!
//! A [`ComparisonBuilder`] produces an immutable [`ComparisonConfig`]; a
//! [`DiffEngine`] turns it into one SQL statement, runs it once and decodes
//! each differing row into a [`DiffRecord`], optionally relaxing equality
//! per column through normalizers and comparators.

pub mod cli;
pub mod commands;
pub mod config;
pub mod connection;
pub mod decode;
pub mod engine;
pub mod error;
pub mod fuzzy;
pub mod output;
pub mod sql;
pub mod value;

pub use config::{ComparisonBuilder, ComparisonConfig, TableRef};
pub use connection::{Database, DuckDbDatabase, Visit};
pub use decode::DiffRecord;
pub use engine::DiffEngine;
pub use error::{Result, RowdiffError};
pub use value::{Row, Value};

/// Primary key column used when none is configured
pub const DEFAULT_PRIMARY_KEY: &str = "id";
