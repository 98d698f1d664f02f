//! Aggregation of per-subject observations into single values.
//!
//! This module provides:
//! - The `Value` read for a subject and the `Aggregate` produced from many
//! - Pure aggregation functions (mean/median/mode/min/max/total/stddev)
//! - Per-kind semantics for booleans, numbers, options, text and cycles

pub mod functions;
pub mod value;

// Re-export main types and functions
pub use functions::{aggregate, aggregate_option, mean, median, std_dev, AggregateFn};
pub use value::{Aggregate, Value, ValueKind};
