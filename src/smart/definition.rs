//! Smart stat definitions as they appear in the event configuration.

use crate::aggregator::AggregateFn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A user-defined derived stat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmartStatDefinition {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(flatten)]
    pub operator: Operator,

    /// Lower is better
    #[serde(default)]
    pub negative: bool,

    /// Compute once from the team's aggregated inputs instead of per match
    #[serde(default)]
    pub is_team_smart_result: bool,

    /// Aggregation used when no function is requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<AggregateFn>,
}

impl SmartStatDefinition {
    /// Whether the stat is evaluated once per team rather than per match
    pub fn is_team_scoped(&self) -> bool {
        self.is_team_smart_result || matches!(self.operator, Operator::WeightedRank(_))
    }

    /// Display name, falling back to the id
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// Operator and its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operator {
    Filter(FilterOp),
    Map(MapOp),
    Math(MathOp),
    #[serde(rename = "minmax")]
    MinMax(MinMaxOp),
    #[serde(rename = "wrank", alias = "weighted_rank")]
    WeightedRank(WeightedRankOp),
    Where(WhereOp),
    Sum(SumOp),
    Ratio(RatioOp),
    Percent(RatioOp),
}

impl Operator {
    pub fn kind(&self) -> OperatorKind {
        match self {
            Operator::Filter(_) => OperatorKind::Filter,
            Operator::Map(_) => OperatorKind::Map,
            Operator::Math(_) => OperatorKind::Math,
            Operator::MinMax(_) => OperatorKind::MinMax,
            Operator::WeightedRank(_) => OperatorKind::WeightedRank,
            Operator::Where(_) => OperatorKind::Where,
            Operator::Sum(_) => OperatorKind::Sum,
            Operator::Ratio(_) => OperatorKind::Ratio,
            Operator::Percent(_) => OperatorKind::Percent,
        }
    }
}

/// Operator discriminant, for listing and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    Filter,
    Map,
    Math,
    MinMax,
    WeightedRank,
    Where,
    Sum,
    Ratio,
    Percent,
}

impl OperatorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperatorKind::Filter => "filter",
            OperatorKind::Map => "map",
            OperatorKind::Math => "math",
            OperatorKind::MinMax => "minmax",
            OperatorKind::WeightedRank => "wrank",
            OperatorKind::Where => "where",
            OperatorKind::Sum => "sum",
            OperatorKind::Ratio => "ratio",
            OperatorKind::Percent => "percent",
        }
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison used by filter conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = ">=")]
    GreaterEqual,
    #[serde(rename = "=", alias = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "<=")]
    LessEqual,
    #[serde(rename = "<")]
    Less,
}

impl Comparison {
    pub fn holds(self, left: f64, right: f64) -> bool {
        match self {
            Comparison::Greater => left > right,
            Comparison::GreaterEqual => left >= right,
            Comparison::Equal => left == right,
            Comparison::NotEqual => left != right,
            Comparison::LessEqual => left <= right,
            Comparison::Less => left < right,
        }
    }
}

/// Keep match results whose `filter` key satisfies a comparison
///
/// Without `key` the stat counts passing matches; with it, the key is
/// aggregated over the passing matches using the stat's `function`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub filter: String,
    pub compare: Comparison,
    /// Number, boolean, or option label
    pub value: serde_json::Value,
}

/// Transform one key: option/boolean lookup table, or linear scale for numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapOp {
    pub key: String,
    #[serde(default)]
    pub values: Vec<f64>,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub offset: f64,
}

fn default_scale() -> f64 {
    1.0
}

/// Arithmetic expression over keys
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MathOp {
    pub math: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Extreme {
    Min,
    Max,
}

/// Extreme value across the observations of several keys
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxOp {
    pub extreme: Extreme,
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedTerm {
    pub key: String,
    #[serde(default = "default_scale")]
    pub weight: f64,
}

/// Weighted average of keys normalized across every team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedRankOp {
    pub terms: Vec<WeightedTerm>,
}

/// Count or sum the cycle entries of a cyclic column matching conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhereOp {
    pub cycle: String,
    /// In-cycle input id to required value (option label, index, or boolean)
    #[serde(default)]
    pub conditions: BTreeMap<String, serde_json::Value>,
    /// In-cycle counter to add up; counts entries when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum: Option<String>,
    /// In-cycle counter completing a percentage: `sum / (sum + denominator)`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denominator: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SumOp {
    pub keys: Vec<String>,
}

/// `ratio` divides numerator by denominator; `percent` divides
/// numerator by their sum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioOp {
    pub numerator: String,
    pub denominator: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_operators() {
        let defs: Vec<SmartStatDefinition> = serde_json::from_value(json!([
            {"id": "acc", "name": "Accuracy", "type": "math", "math": "made / shots * 100"},
            {"id": "best", "type": "minmax", "extreme": "max", "keys": ["auto", "tele"]},
            {"id": "score", "type": "weighted_rank", "terms": [{"key": "auto", "weight": 2}]},
            {"id": "high", "type": "where", "cycle": "shots", "conditions": {"goal": "High"}},
            {"id": "park", "type": "filter", "filter": "climb", "compare": "=", "value": "Park", "function": "total"}
        ]))
        .unwrap();

        assert_eq!(defs[0].operator.kind(), OperatorKind::Math);
        assert_eq!(defs[1].operator, Operator::MinMax(MinMaxOp {
            extreme: Extreme::Max,
            keys: vec!["auto".into(), "tele".into()],
        }));
        assert!(defs[2].is_team_scoped());
        assert_eq!(defs[2].display_name(), "score");
        assert_eq!(defs[3].operator.kind(), OperatorKind::Where);
        assert_eq!(defs[4].function, Some(AggregateFn::Total));
    }

    #[test]
    fn test_comparison() {
        assert!(Comparison::GreaterEqual.holds(3.0, 3.0));
        assert!(!Comparison::NotEqual.holds(1.0, 1.0));
    }
}
