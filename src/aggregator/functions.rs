//! Aggregation functions over typed value sequences.
//!
//! Missing values are filtered before aggregating. An empty filtered
//! sequence yields [`Aggregate::NoData`], never NaN or 0.
//!
//! Mode ties resolve to the first-encountered value among those sharing
//! the maximum count.

use super::value::{Aggregate, Value, ValueKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported aggregation functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFn {
    Mean,
    Median,
    Mode,
    Min,
    Max,
    Total,
    #[value(name = "stddev")]
    StdDev,
}

impl AggregateFn {
    pub const ALL: [AggregateFn; 7] = [
        AggregateFn::Mean,
        AggregateFn::Median,
        AggregateFn::Mode,
        AggregateFn::Min,
        AggregateFn::Max,
        AggregateFn::Total,
        AggregateFn::StdDev,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AggregateFn::Mean => "mean",
            AggregateFn::Median => "median",
            AggregateFn::Mode => "mode",
            AggregateFn::Min => "min",
            AggregateFn::Max => "max",
            AggregateFn::Total => "total",
            AggregateFn::StdDev => "stddev",
        }
    }
}

impl fmt::Display for AggregateFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregateFn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AggregateFn::ALL
            .into_iter()
            .find(|func| func.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown aggregation function '{}'", s))
    }
}

/// Aggregate a value sequence
///
/// **Public** - main entry point for aggregation
///
/// # Arguments
/// * `values` - Observations; `Missing` entries are skipped, lists expanded
/// * `func` - Aggregation function
/// * `kind` - How the values are interpreted
///
/// # Returns
/// The aggregate, or `Aggregate::NoData` when nothing remains after filtering
pub fn aggregate(values: &[Value], func: AggregateFn, kind: ValueKind) -> Aggregate {
    let flat = Value::flatten(values);
    if flat.is_empty() {
        return Aggregate::NoData;
    }

    match kind {
        ValueKind::Numeric | ValueKind::Cycle => {
            let numbers: Vec<f64> = flat.iter().filter_map(|v| v.as_f64()).collect();
            numeric(&numbers, func)
        }
        ValueKind::Boolean => boolean(&flat, func),
        ValueKind::Enumerated { options } => enumerated(&flat, func, options),
        ValueKind::Text => text(&flat, func),
    }
}

/// Aggregate how often one option of an enumerated field was chosen
///
/// Each observation counts as 1 when the option is chosen and 0 otherwise,
/// so `mean` is the selection frequency and `total` the selection count.
pub fn aggregate_option(values: &[Value], func: AggregateFn, option: usize) -> Aggregate {
    let indicators: Vec<f64> = Value::flatten(values)
        .into_iter()
        .filter_map(|value| match value {
            Value::Choice(i) => Some(*i == option),
            Value::Flags(flags) => Some(flags.get(option).copied().unwrap_or(false)),
            Value::Bool(b) => Some(usize::from(*b) == option),
            _ => None,
        })
        .map(|chosen| if chosen { 1.0 } else { 0.0 })
        .collect();
    numeric(&indicators, func)
}

/// Numeric aggregation
fn numeric(values: &[f64], func: AggregateFn) -> Aggregate {
    let result = match func {
        AggregateFn::Mean => mean(values),
        AggregateFn::Median => median(values),
        AggregateFn::Mode => first_mode(values.iter().copied(), |a, b| a == b),
        AggregateFn::Min => values.iter().copied().reduce(f64::min),
        AggregateFn::Max => values.iter().copied().reduce(f64::max),
        AggregateFn::Total => (!values.is_empty()).then(|| values.iter().sum::<f64>()),
        AggregateFn::StdDev => std_dev(values),
    };
    result.map_or(Aggregate::NoData, Aggregate::Number)
}

/// Boolean aggregation: numeric functions see 0/1
fn boolean(values: &[&Value], func: AggregateFn) -> Aggregate {
    let flags: Vec<bool> = values
        .iter()
        .filter_map(|v| match v {
            Value::Bool(b) => Some(*b),
            other => other.as_f64().map(|n| n != 0.0),
        })
        .collect();
    if flags.is_empty() {
        return Aggregate::NoData;
    }

    match func {
        AggregateFn::Mode => first_mode(flags.iter().copied(), |a, b| a == b)
            .map_or(Aggregate::NoData, Aggregate::Bool),
        AggregateFn::Min => Aggregate::Bool(flags.iter().all(|b| *b)),
        AggregateFn::Max => Aggregate::Bool(flags.iter().any(|b| *b)),
        _ => {
            let numbers: Vec<f64> = flags.iter().map(|b| if *b { 1.0 } else { 0.0 }).collect();
            numeric(&numbers, func)
        }
    }
}

/// Enumerated aggregation over option indices
///
/// Mean and mode give the most frequent option, median the middle index,
/// min the least frequent declared option, max the most frequent one, and
/// total the per-option counts. Stddev has no meaning for options.
fn enumerated(values: &[&Value], func: AggregateFn, options: usize) -> Aggregate {
    let mut picks: Vec<usize> = Vec::with_capacity(values.len());
    for value in values {
        match value {
            Value::Choice(i) => picks.push(*i),
            Value::Flags(flags) => {
                picks.extend(flags.iter().enumerate().filter(|(_, f)| **f).map(|(i, _)| i))
            }
            Value::Bool(b) => picks.push(usize::from(*b)),
            Value::Number(n) if *n >= 0.0 && *n < options as f64 && n.fract() == 0.0 => {
                picks.push(*n as usize)
            }
            _ => {}
        }
    }
    // Picks outside the declared options do not match the current config
    picks.retain(|pick| *pick < options);
    if picks.is_empty() {
        return Aggregate::NoData;
    }

    let mut counts = vec![0u64; options];
    for pick in &picks {
        counts[*pick] += 1;
    }

    match func {
        AggregateFn::Mean | AggregateFn::Mode | AggregateFn::Max => {
            first_mode(picks.iter().copied(), |a, b| a == b)
                .map_or(Aggregate::NoData, Aggregate::Choice)
        }
        AggregateFn::Median => {
            let mut sorted = picks.clone();
            sorted.sort_unstable();
            Aggregate::Choice(sorted[(sorted.len() - 1) / 2])
        }
        AggregateFn::Min => counts
            .iter()
            .enumerate()
            .min_by_key(|(_, count)| **count)
            .map_or(Aggregate::NoData, |(i, _)| Aggregate::Choice(i)),
        AggregateFn::Total => Aggregate::Counts(counts),
        AggregateFn::StdDev => Aggregate::NoData,
    }
}

/// Text aggregation: only the mode is meaningful
fn text(values: &[&Value], func: AggregateFn) -> Aggregate {
    if func != AggregateFn::Mode {
        return Aggregate::NoData;
    }
    let strings = values.iter().filter_map(|v| match v {
        Value::Text(s) => Some(s.as_str()),
        _ => None,
    });
    first_mode(strings, |a, b| a == b).map_or(Aggregate::NoData, |s| Aggregate::Text(s.to_string()))
}

/// Arithmetic mean
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median; even lengths average the two central values
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let len = sorted.len();
    if len % 2 == 0 {
        Some((sorted[len / 2 - 1] + sorted[len / 2]) / 2.0)
    } else {
        Some(sorted[len / 2])
    }
}

/// Population standard deviation (divisor n)
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Most frequent item; ties go to the first-encountered candidate
fn first_mode<T: Copy>(items: impl IntoIterator<Item = T>, eq: impl Fn(&T, &T) -> bool) -> Option<T> {
    // (value, count) in first-seen order
    let mut tally: Vec<(T, usize)> = Vec::new();
    for item in items {
        match tally.iter_mut().find(|(seen, _)| eq(seen, &item)) {
            Some((_, count)) => *count += 1,
            None => tally.push((item, 1)),
        }
    }

    let mut best: Option<(T, usize)> = None;
    for (value, count) in tally {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}
