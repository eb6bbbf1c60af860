//! Cell values carried through result rows, diff maps and bound parameters

use chrono::{DateTime, NaiveDate, NaiveTime};
use duckdb::types::{TimeUnit, ValueRef};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered column → value mapping (one side of a row, or a diff map)
pub type Row = IndexMap<String, Value>;

/// A single cell value
///
/// Equality is strict and structural: `Integer(10)` and `Float(10.0)` are
/// different values, while two `Null`s are equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of the value, parsing text when it holds a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Convert a DuckDB result cell into an owned value
    pub fn from_duckdb(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Boolean(b) => Value::Boolean(b),
            ValueRef::TinyInt(i) => Value::Integer(i64::from(i)),
            ValueRef::SmallInt(i) => Value::Integer(i64::from(i)),
            ValueRef::Int(i) => Value::Integer(i64::from(i)),
            ValueRef::BigInt(i) => Value::Integer(i),
            ValueRef::HugeInt(i) => match i64::try_from(i) {
                Ok(i) => Value::Integer(i),
                Err(_) => Value::Text(i.to_string()),
            },
            ValueRef::UTinyInt(i) => Value::Integer(i64::from(i)),
            ValueRef::USmallInt(i) => Value::Integer(i64::from(i)),
            ValueRef::UInt(i) => Value::Integer(i64::from(i)),
            ValueRef::UBigInt(i) => match i64::try_from(i) {
                Ok(i) => Value::Integer(i),
                Err(_) => Value::Text(i.to_string()),
            },
            ValueRef::Float(f) => Value::Float(f64::from(f)),
            ValueRef::Double(f) => Value::Float(f),
            ValueRef::Decimal(d) => Value::Text(d.to_string()),
            ValueRef::Text(s) => Value::Text(String::from_utf8_lossy(s).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
            ValueRef::Date32(days) => Value::Text(render_date(days)),
            ValueRef::Time64(unit, t) => Value::Text(render_time(to_micros(unit, t))),
            ValueRef::Timestamp(unit, ts) => Value::Text(render_timestamp(to_micros(unit, ts))),
            other => Value::Text(format!("{:?}", other)),
        }
    }
}

impl From<&Value> for duckdb::types::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => duckdb::types::Value::Null,
            Value::Boolean(b) => duckdb::types::Value::Boolean(*b),
            Value::Integer(i) => duckdb::types::Value::BigInt(*i),
            Value::Float(f) => duckdb::types::Value::Double(*f),
            Value::Text(s) => duckdb::types::Value::Text(s.clone()),
            Value::Blob(b) => duckdb::types::Value::Blob(b.clone()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "{}", s),
            Value::Blob(b) => write!(f, "<blob:{} bytes>", b.len()),
        }
    }
}

fn to_micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

fn render_date(days_since_epoch: i32) -> String {
    NaiveDate::from_ymd_opt(1970, 1, 1)
        .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::days(i64::from(days_since_epoch))))
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| days_since_epoch.to_string())
}

fn render_time(micros_since_midnight: i64) -> String {
    let secs = micros_since_midnight.div_euclid(1_000_000);
    let nanos = micros_since_midnight.rem_euclid(1_000_000) * 1_000;
    u32::try_from(secs)
        .ok()
        .and_then(|s| NaiveTime::from_num_seconds_from_midnight_opt(s, nanos as u32))
        .map(|t| t.format("%H:%M:%S%.f").to_string())
        .unwrap_or_else(|| micros_since_midnight.to_string())
}

fn render_timestamp(micros: i64) -> String {
    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    DateTime::from_timestamp(secs, nanos)
        .map(|ts| ts.naive_utc().format("%Y-%m-%d %H:%M:%S%.f").to_string())
        .unwrap_or_else(|| micros.to_string())
}
