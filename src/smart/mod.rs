//! User-defined derived stats ("smart stats").
//!
//! This module provides:
//! - Definitions as read from the event configuration
//! - The math expression language used by `math` stats
//! - Load-time compilation, reference checks and cycle detection
//! - The evaluation engine

pub mod definition;
pub mod engine;
pub mod expression;
pub mod validation;

pub use definition::{Comparison, Extreme, Operator, OperatorKind, SmartStatDefinition};
pub use engine::{Evaluation, SmartStatEngine};
pub use expression::{parse_expression, Expr};
pub use validation::{compile_definitions, CompiledStat, Plan, ValidationReport};
