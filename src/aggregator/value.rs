//! Value types flowing into and out of aggregation.

use crate::parser::schema::CycleEntry;
use crate::utils::config::NO_DATA_DISPLAY;
use serde::{Deserialize, Serialize};

/// A value read for one subject, before aggregation
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// No record yet, or the field is absent from the record.
    /// Always excluded from aggregation, never coerced to 0 or "".
    Missing,
    Bool(bool),
    Number(f64),
    /// Index into an enumerated field's option list
    Choice(usize),
    /// Multiselect flags, one per option
    Flags(Vec<bool>),
    Text(String),
    Cycles(Vec<CycleEntry>),
    /// Several observations for the subject (per match, or per cycle)
    List(Vec<Value>),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Numeric reading of a single observation
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Choice(i) => Some(*i as f64),
            Value::Cycles(entries) => Some(entries.len() as f64),
            _ => None,
        }
    }

    /// Non-missing leaf observations, with lists expanded in order
    pub fn flatten<'a>(values: &'a [Value]) -> Vec<&'a Value> {
        let mut out = Vec::with_capacity(values.len());
        for value in values {
            match value {
                Value::Missing => {}
                Value::List(inner) => out.extend(Value::flatten(inner)),
                other => out.push(other),
            }
        }
        out
    }
}

/// How a sequence of values should be aggregated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Boolean,
    Numeric,
    Enumerated { options: usize },
    Text,
    /// A cyclic column, aggregated by cycle count
    Cycle,
}

/// Result of aggregating a sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Aggregate {
    /// Aggregation over zero eligible inputs
    NoData,
    Bool(bool),
    Number(f64),
    Choice(usize),
    /// Per-option counts, indexed by option
    Counts(Vec<u64>),
    Text(String),
}

impl Aggregate {
    pub fn is_no_data(&self) -> bool {
        matches!(self, Aggregate::NoData)
    }

    /// Sortable numeric reading, if the aggregate has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Aggregate::Number(n) => Some(*n),
            Aggregate::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Aggregate::Choice(i) => Some(*i as f64),
            Aggregate::NoData | Aggregate::Counts(_) | Aggregate::Text(_) => None,
        }
    }

    /// Convert back to a single observation (used when a team value
    /// feeds a higher-level aggregation)
    pub fn into_value(self) -> Value {
        match self {
            Aggregate::NoData | Aggregate::Counts(_) => Value::Missing,
            Aggregate::Bool(b) => Value::Bool(b),
            Aggregate::Number(n) => Value::Number(n),
            Aggregate::Choice(i) => Value::Choice(i),
            Aggregate::Text(s) => Value::Text(s),
        }
    }

    /// Human-readable rendering
    ///
    /// # Arguments
    /// * `options` - Option labels of the aggregated field (may be empty)
    /// * `decimals` - Decimal places for fractional numbers
    pub fn display(&self, options: &[String], decimals: usize) -> String {
        match self {
            Aggregate::NoData => NO_DATA_DISPLAY.to_string(),
            Aggregate::Bool(true) => "Yes".to_string(),
            Aggregate::Bool(false) => "No".to_string(),
            Aggregate::Number(n) if n.fract() == 0.0 => format!("{}", n),
            Aggregate::Number(n) => format!("{:.*}", decimals, n),
            Aggregate::Choice(i) => options
                .get(*i)
                .cloned()
                .unwrap_or_else(|| i.to_string()),
            Aggregate::Counts(counts) => counts
                .iter()
                .enumerate()
                .map(|(i, count)| {
                    let label = options.get(i).cloned().unwrap_or_else(|| i.to_string());
                    format!("{}: {}", label, count)
                })
                .collect::<Vec<_>>()
                .join(", "),
            Aggregate::Text(s) => s.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_skips_missing_and_expands_lists() {
        let values = vec![
            Value::Number(1.0),
            Value::Missing,
            Value::List(vec![Value::Number(2.0), Value::Missing, Value::Number(3.0)]),
        ];
        let flat: Vec<f64> = Value::flatten(&values).iter().filter_map(|v| v.as_f64()).collect();
        assert_eq!(flat, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_display() {
        let options = vec!["Low".to_string(), "High".to_string()];
        assert_eq!(Aggregate::NoData.display(&options, 2), "---");
        assert_eq!(Aggregate::Choice(1).display(&options, 2), "High");
        assert_eq!(Aggregate::Number(2.0 / 3.0).display(&[], 2), "0.67");
        assert_eq!(Aggregate::Number(4.0).display(&[], 2), "4");
        assert_eq!(Aggregate::Bool(true).display(&[], 2), "Yes");
        assert_eq!(Aggregate::Counts(vec![3, 1]).display(&options, 2), "Low: 3, High: 1");
    }
}
