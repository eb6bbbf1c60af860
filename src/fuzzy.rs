//! Fuzzy matching: per-column normalization and relaxed equality
//!
//! Normalizers and comparators are capability traits so they can be typed
//! and tested on their own. Plain closures of the right shape implement
//! them automatically.

use crate::error::{Result, RowdiffError};
use crate::value::{Row, Value};
use indexmap::IndexMap;
use std::sync::Arc;

/// Transforms a single value before equality testing
pub trait Normalizer: Send + Sync {
    fn normalize(&self, value: &Value) -> Value;
}

/// Relaxed equality predicate for one column (true = equal)
pub trait Comparator: Send + Sync {
    fn equals(&self, a: &Value, b: &Value) -> bool;
}

impl<F> Normalizer for F
where
    F: Fn(&Value) -> Value + Send + Sync,
{
    fn normalize(&self, value: &Value) -> Value {
        self(value)
    }
}

impl<F> Comparator for F
where
    F: Fn(&Value, &Value) -> bool + Send + Sync,
{
    fn equals(&self, a: &Value, b: &Value) -> bool {
        self(a, b)
    }
}

pub type NormalizerChain = Vec<Arc<dyn Normalizer>>;
pub type NormalizerMap = IndexMap<String, NormalizerChain>;
pub type ComparatorMap = IndexMap<String, Arc<dyn Comparator>>;

/// Strips surrounding whitespace from text
#[derive(Debug, Clone, Copy, Default)]
pub struct Trim;

impl Normalizer for Trim {
    fn normalize(&self, value: &Value) -> Value {
        match value {
            Value::Text(s) => Value::Text(s.trim().to_string()),
            other => other.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Lowercase;

impl Normalizer for Lowercase {
    fn normalize(&self, value: &Value) -> Value {
        match value {
            Value::Text(s) => Value::Text(s.to_lowercase()),
            other => other.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Uppercase;

impl Normalizer for Uppercase {
    fn normalize(&self, value: &Value) -> Value {
        match value {
            Value::Text(s) => Value::Text(s.to_uppercase()),
            other => other.clone(),
        }
    }
}

/// Treats NULL as the empty string
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAsEmpty;

impl Normalizer for NullAsEmpty {
    fn normalize(&self, value: &Value) -> Value {
        match value {
            Value::Null => Value::Text(String::new()),
            other => other.clone(),
        }
    }
}

/// Largest precision [`Round`] applies; an `f64` carries no finer digits
pub const MAX_ROUND_DECIMALS: u32 = 15;

/// Rounds numeric values (including numeric text) to a fixed number of decimals
///
/// Precision above [`MAX_ROUND_DECIMALS`] leaves the number as it is.
#[derive(Debug, Clone, Copy)]
pub struct Round(pub u32);

impl Normalizer for Round {
    fn normalize(&self, value: &Value) -> Value {
        match value {
            Value::Integer(_) | Value::Null => value.clone(),
            other => match other.as_f64() {
                Some(x) => match i32::try_from(self.0) {
                    Ok(decimals) if self.0 <= MAX_ROUND_DECIMALS => {
                        let factor = 10f64.powi(decimals);
                        Value::Float((x * factor).round() / factor)
                    }
                    _ => Value::Float(x),
                },
                None => other.clone(),
            },
        }
    }
}

/// Exact structural equality; installed for normalized columns with no comparator
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictEquality;

impl Comparator for StrictEquality {
    fn equals(&self, a: &Value, b: &Value) -> bool {
        a == b
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CaseInsensitive;

impl Comparator for CaseInsensitive {
    fn equals(&self, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Text(x), Value::Text(y)) => x.to_lowercase() == y.to_lowercase(),
            _ => a == b,
        }
    }
}

/// Numbers within `epsilon` of each other are equal
#[derive(Debug, Clone, Copy)]
pub struct NumericTolerance(pub f64);

impl Comparator for NumericTolerance {
    fn equals(&self, a: &Value, b: &Value) -> bool {
        match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => (x - y).abs() <= self.0,
            _ => a == b,
        }
    }
}

/// Look up a built-in normalizer by name (`trim`, `lowercase`, `uppercase`,
/// `null-as-empty`, `round:N`)
pub fn normalizer_by_name(name: &str) -> Result<Arc<dyn Normalizer>> {
    let name = name.trim().to_lowercase();
    match name.as_str() {
        "trim" => Ok(Arc::new(Trim)),
        "lowercase" | "lower" => Ok(Arc::new(Lowercase)),
        "uppercase" | "upper" => Ok(Arc::new(Uppercase)),
        "null-as-empty" => Ok(Arc::new(NullAsEmpty)),
        s if s.starts_with("round:") => {
            let decimals: u32 = s["round:".len()..]
                .parse()
                .map_err(|_| RowdiffError::invalid_input(format!("Invalid rounding precision: {}", s)))?;
            if decimals > MAX_ROUND_DECIMALS {
                return Err(RowdiffError::invalid_input(format!(
                    "Rounding precision must be at most {}: {}",
                    MAX_ROUND_DECIMALS, s
                )));
            }
            Ok(Arc::new(Round(decimals)))
        }
        _ => Err(RowdiffError::invalid_input(format!(
            "Unknown normalizer: {}. Use 'trim', 'lowercase', 'uppercase', 'null-as-empty' or 'round:N'",
            name
        ))),
    }
}

/// Look up a built-in comparator (`strict`, `case-insensitive`, `tolerance:EPS`)
pub fn comparator_by_spec(spec: &str) -> Result<Arc<dyn Comparator>> {
    let spec = spec.trim().to_lowercase();
    match spec.as_str() {
        "strict" => Ok(Arc::new(StrictEquality)),
        "case-insensitive" | "nocase" => Ok(Arc::new(CaseInsensitive)),
        s if s.starts_with("tolerance:") => {
            let epsilon: f64 = s["tolerance:".len()..]
                .parse()
                .map_err(|_| RowdiffError::invalid_input(format!("Invalid tolerance: {}", s)))?;
            if !epsilon.is_finite() || epsilon < 0.0 {
                return Err(RowdiffError::invalid_input(format!(
                    "Tolerance must be a non-negative number: {}",
                    s
                )));
            }
            Ok(Arc::new(NumericTolerance(epsilon)))
        }
        _ => Err(RowdiffError::invalid_input(format!(
            "Unknown comparator: {}. Use 'strict', 'case-insensitive' or 'tolerance:EPS'",
            spec
        ))),
    }
}

/// Relaxes which columns count as different for one record
///
/// Works on copies of the diff maps; the full rows are never touched.
pub struct FuzzyMatcher<'a> {
    normalizers: &'a NormalizerMap,
    comparators: &'a ComparatorMap,
}

impl<'a> FuzzyMatcher<'a> {
    pub fn new(normalizers: &'a NormalizerMap, comparators: &'a ComparatorMap) -> Self {
        Self {
            normalizers,
            comparators,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.normalizers.is_empty() || !self.comparators.is_empty()
    }

    /// Drop every column judged equal from both diff maps, in place
    pub fn apply(&self, source_diff: &mut Row, dest_diff: &mut Row) {
        let mut source_work = source_diff.clone();
        let mut dest_work = dest_diff.clone();

        // Comparators active for this record only; normalized columns
        // without an explicit comparator fall back to strict equality.
        let mut active: IndexMap<&str, &dyn Comparator> = self
            .comparators
            .iter()
            .map(|(column, cmp)| (column.as_str(), cmp.as_ref()))
            .collect();

        for (column, chain) in self.normalizers {
            let Some(source_value) = source_work.get_mut(column) else {
                continue;
            };
            *source_value = normalize_chain(chain, source_value);
            if let Some(dest_value) = dest_work.get_mut(column) {
                *dest_value = normalize_chain(chain, dest_value);
            }
            active.entry(column.as_str()).or_insert(&StrictEquality);
        }

        for (column, comparator) in active {
            let Some(source_value) = source_work.get(column) else {
                continue;
            };
            let equal = match dest_work.get(column) {
                Some(dest_value) => comparator.equals(source_value, dest_value),
                None => comparator.equals(source_value, &Value::Null),
            };
            if equal {
                log::trace!("fuzzy match suppressed column {}", column);
                source_work.shift_remove(column);
                dest_work.shift_remove(column);
            }
        }

        source_diff.retain(|column, _| source_work.contains_key(column));
        dest_diff.retain(|column, _| dest_work.contains_key(column));
    }
}

fn normalize_chain(chain: &[Arc<dyn Normalizer>], value: &Value) -> Value {
    chain
        .iter()
        .fold(value.clone(), |acc, normalizer| normalizer.normalize(&acc))
}
