//! Load-time compilation and validation of smart stat definitions.
//!
//! Every definition is checked independently and every problem is
//! collected, so a config author sees all of them at once. A definition
//! is excluded from the working set when:
//! - it references a key that does not resolve, or of the wrong kind
//! - its math expression fails to parse
//! - it takes part in a dependency cycle
//! - it depends on another excluded definition

use super::definition::{Comparison, Extreme, Operator, SmartStatDefinition};
use super::expression::{parse_expression, Expr};
use crate::aggregator::ValueKind;
use crate::keys::{is_identifier, FieldMeta, KeyResolver, Namespace, NamespacedKey};
use crate::utils::error::InvalidDefinitionError;
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap, HashSet};

/// A definition with every reference resolved
#[derive(Debug, Clone)]
pub struct CompiledStat {
    pub definition: SmartStatDefinition,
    pub key: NamespacedKey,
    pub plan: Plan,
    /// Smart stats this one reads
    pub dependencies: Vec<NamespacedKey>,
}

impl CompiledStat {
    pub fn is_team_scoped(&self) -> bool {
        self.definition.is_team_scoped()
    }
}

/// Resolved operator parameters
#[derive(Debug, Clone)]
pub enum Plan {
    Filter {
        key: Option<NamespacedKey>,
        filter: NamespacedKey,
        compare: Comparison,
        threshold: f64,
    },
    Map {
        key: NamespacedKey,
        values: Vec<f64>,
        scale: f64,
        offset: f64,
    },
    Math {
        expr: Expr,
        bindings: HashMap<String, NamespacedKey>,
    },
    MinMax {
        extreme: Extreme,
        keys: Vec<NamespacedKey>,
    },
    WeightedRank {
        terms: Vec<WeightTerm>,
    },
    Where {
        cycle: NamespacedKey,
        conditions: Vec<(FieldMeta, f64)>,
        sum: Option<FieldMeta>,
        denominator: Option<FieldMeta>,
    },
    Sum {
        keys: Vec<NamespacedKey>,
    },
    Ratio {
        numerator: NamespacedKey,
        denominator: NamespacedKey,
        percent: bool,
    },
}

#[derive(Debug, Clone)]
pub struct WeightTerm {
    pub key: NamespacedKey,
    pub weight: f64,
    pub negative: bool,
}

/// Outcome of validating a configuration's smart stats
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub compiled: Vec<CompiledStat>,
    pub errors: Vec<InvalidDefinitionError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Ids of excluded definitions
    pub fn invalid_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.errors.iter().map(|e| e.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// Compile and validate smart stat definitions
///
/// **Public** - main entry point for load-time validation
///
/// Valid stats stay registered in `resolver` as `smart.*` keys; invalid
/// ones are withdrawn.
///
/// # Returns
/// Compiled valid stats in configuration order, plus every error found
pub fn compile_definitions(
    definitions: &[SmartStatDefinition],
    resolver: &mut KeyResolver,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    // Register every id first so smart stats can reference each other
    let mut accepted: Vec<&SmartStatDefinition> = Vec::new();
    let mut seen = HashSet::new();
    for def in definitions {
        if !is_identifier(&def.id) {
            report.errors.push(InvalidDefinitionError::new(
                &def.id,
                "id must be letters, digits and underscores",
            ));
        } else if !seen.insert(def.id.as_str()) {
            report.errors.push(InvalidDefinitionError::new(&def.id, "duplicate id"));
        } else {
            resolver.register_smart(&def.id, def.display_name(), def.negative);
            accepted.push(def);
        }
    }

    let mut compiled: Vec<CompiledStat> = Vec::new();
    for def in accepted {
        match compile(def, resolver) {
            Ok(stat) => compiled.push(stat),
            Err(reason) => report.errors.push(InvalidDefinitionError::new(&def.id, reason)),
        }
    }

    let mut invalid: HashSet<NamespacedKey> = definitions
        .iter()
        .map(|def| NamespacedKey::smart(def.id.clone()))
        .filter(|key| !compiled.iter().any(|stat| stat.key == *key))
        .collect();

    for cycle in find_cycles(&compiled) {
        let path = cycle.iter().map(|k| k.id.as_str()).collect::<Vec<_>>().join(" -> ");
        for key in &cycle[..cycle.len() - 1] {
            if invalid.insert(key.clone()) {
                report.errors.push(InvalidDefinitionError::new(
                    &key.id,
                    format!("circular dependency: {}", path),
                ));
            }
        }
    }

    // Anything depending on an excluded stat is excluded too
    loop {
        let newly: Vec<(NamespacedKey, String)> = compiled
            .iter()
            .filter(|stat| !invalid.contains(&stat.key))
            .filter_map(|stat| {
                stat.dependencies
                    .iter()
                    .find(|dep| invalid.contains(*dep))
                    .map(|dep| (stat.key.clone(), dep.id.clone()))
            })
            .collect();
        if newly.is_empty() {
            break;
        }
        for (key, dep) in newly {
            report.errors.push(InvalidDefinitionError::new(
                &key.id,
                format!("depends on invalid stat '{}'", dep),
            ));
            invalid.insert(key);
        }
    }

    for key in &invalid {
        resolver.remove(key);
    }
    compiled.retain(|stat| !invalid.contains(&stat.key));

    for error in &report.errors {
        warn!("Excluding smart stat: {}", error);
    }
    debug!(
        "Compiled {} smart stats, {} excluded",
        compiled.len(),
        invalid.len()
    );

    report.compiled = compiled;
    report
}

/// Resolve one definition's references and operator parameters
fn compile(def: &SmartStatDefinition, resolver: &KeyResolver) -> Result<CompiledStat, String> {
    let numeric = |reference: &str| numeric_key(resolver, reference);

    let plan = match &def.operator {
        Operator::Filter(op) => {
            let filter = resolver
                .resolve_reference(&op.filter)
                .map_err(|e| e.to_string())?;
            let meta = resolver.resolve(&filter).map_err(|e| e.to_string())?;
            if meta.value_kind() == ValueKind::Text {
                return Err(format!("cannot filter on text key '{}'", filter));
            }
            Plan::Filter {
                key: op.key.as_deref().map(numeric).transpose()?,
                threshold: target_value(meta, &op.value)?,
                filter,
                compare: op.compare,
            }
        }
        Operator::Map(op) => {
            let key = resolver.resolve_reference(&op.key).map_err(|e| e.to_string())?;
            let meta = resolver.resolve(&key).map_err(|e| e.to_string())?;
            let table_size = match meta.value_kind() {
                ValueKind::Enumerated { options } => Some(options),
                ValueKind::Boolean => Some(2),
                ValueKind::Text => return Err(format!("cannot map text key '{}'", key)),
                _ => None,
            };
            if let Some(options) = table_size.filter(|_| key.option.is_none()) {
                if op.values.len() != options {
                    return Err(format!(
                        "map of '{}' needs {} values, got {}",
                        key,
                        options,
                        op.values.len()
                    ));
                }
            }
            Plan::Map {
                key,
                values: op.values.clone(),
                scale: op.scale,
                offset: op.offset,
            }
        }
        Operator::Math(op) => {
            let expr = parse_expression(&op.math).map_err(|e| format!("invalid math: {}", e))?;
            let mut bindings = HashMap::new();
            for reference in expr.references() {
                bindings.insert(reference.to_string(), numeric(reference)?);
            }
            Plan::Math { expr, bindings }
        }
        Operator::MinMax(op) => Plan::MinMax {
            extreme: op.extreme,
            keys: non_empty(&op.keys)?.iter().map(|k| numeric_key(resolver, k)).collect::<Result<_, _>>()?,
        },
        Operator::WeightedRank(op) => {
            if op.terms.is_empty() {
                return Err("no keys given".to_string());
            }
            let mut terms = Vec::with_capacity(op.terms.len());
            for term in &op.terms {
                let key = numeric_key(resolver, &term.key)?;
                let negative = resolver
                    .resolve(&key)
                    .map(|meta| meta.is_negative(key.option))
                    .unwrap_or(false);
                terms.push(WeightTerm {
                    key,
                    weight: term.weight,
                    negative,
                });
            }
            Plan::WeightedRank { terms }
        }
        Operator::Where(op) => compile_where(
            resolver,
            &op.cycle,
            &op.conditions,
            op.sum.as_deref(),
            op.denominator.as_deref(),
        )?,
        Operator::Sum(op) => Plan::Sum {
            keys: non_empty(&op.keys)?.iter().map(|k| numeric_key(resolver, k)).collect::<Result<_, _>>()?,
        },
        Operator::Ratio(op) | Operator::Percent(op) => Plan::Ratio {
            numerator: numeric_key(resolver, &op.numerator)?,
            denominator: numeric_key(resolver, &op.denominator)?,
            percent: matches!(def.operator, Operator::Percent(_)),
        },
    };

    let dependencies = plan_keys(&plan)
        .into_iter()
        .filter(|key| key.namespace == Namespace::Smart)
        .map(|key| key.base())
        .collect();

    Ok(CompiledStat {
        definition: def.clone(),
        key: NamespacedKey::smart(def.id.clone()),
        plan,
        dependencies,
    })
}

fn compile_where(
    resolver: &KeyResolver,
    cycle: &str,
    conditions: &BTreeMap<String, serde_json::Value>,
    sum: Option<&str>,
    denominator: Option<&str>,
) -> Result<Plan, String> {
    let cycle_key = resolver.resolve_reference(cycle).map_err(|e| e.to_string())?;
    let cycle_meta = resolver.resolve(&cycle_key).map_err(|e| e.to_string())?;
    if cycle_meta.value_kind() != ValueKind::Cycle {
        return Err(format!("'{}' is not a cyclic column", cycle_key));
    }

    // Inputs recorded inside this cycle
    let in_cycle = |id: &str| -> Result<FieldMeta, String> {
        let key = resolver.resolve_reference(id).map_err(|e| e.to_string())?;
        let meta = resolver.resolve(&key).map_err(|e| e.to_string())?;
        if meta.cycle.as_deref() != Some(cycle_key.id.as_str()) {
            return Err(format!("'{}' is not recorded in cycle '{}'", key, cycle_key.id));
        }
        Ok(meta.clone())
    };

    let mut compiled = Vec::with_capacity(conditions.len());
    for (id, value) in conditions {
        let meta = in_cycle(id)?;
        let target = target_value(&meta, value)?;
        compiled.push((meta, target));
    }
    let counter = |id: &str| -> Result<FieldMeta, String> {
        let meta = in_cycle(id)?;
        if meta.value_kind() != ValueKind::Numeric {
            return Err(format!("'{}' is not a number", meta.key));
        }
        Ok(meta)
    };

    Ok(Plan::Where {
        cycle: cycle_key.clone(),
        conditions: compiled,
        sum: sum.map(|id| counter(id)).transpose()?,
        denominator: denominator.map(|id| counter(id)).transpose()?,
    })
}

/// Resolve a reference whose values must be numeric
fn numeric_key(resolver: &KeyResolver, reference: &str) -> Result<NamespacedKey, String> {
    let key = resolver.resolve_reference(reference).map_err(|e| e.to_string())?;
    let meta = resolver.resolve(&key).map_err(|e| e.to_string())?;
    match meta.value_kind() {
        ValueKind::Text => Err(format!("'{}' is not numeric", key)),
        ValueKind::Enumerated { .. } if key.option.is_none() => {
            Err(format!("'{}' needs an option index, e.g. {}.0", key, key))
        }
        _ => Ok(key),
    }
}

/// Numeric target for a condition: option label, option index, boolean or number
fn target_value(meta: &FieldMeta, value: &serde_json::Value) -> Result<f64, String> {
    match value {
        serde_json::Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("invalid number {} for '{}'", n, meta.key)),
        serde_json::Value::String(label) => {
            if meta.value_kind() == ValueKind::Boolean {
                match label.to_ascii_lowercase().as_str() {
                    "yes" | "true" => return Ok(1.0),
                    "no" | "false" => return Ok(0.0),
                    _ => {}
                }
            }
            meta.option_index(label)
                .map(|i| i as f64)
                .or_else(|| label.trim().parse().ok())
                .ok_or_else(|| format!("'{}' is not an option of '{}'", label, meta.key))
        }
        other => Err(format!("unsupported value {} for '{}'", other, meta.key)),
    }
}

fn non_empty(keys: &[String]) -> Result<&[String], String> {
    if keys.is_empty() {
        Err("no keys given".to_string())
    } else {
        Ok(keys)
    }
}

/// Every key a plan reads
fn plan_keys(plan: &Plan) -> Vec<NamespacedKey> {
    match plan {
        Plan::Filter { key, filter, .. } => key.iter().cloned().chain([filter.clone()]).collect(),
        Plan::Map { key, .. } => vec![key.clone()],
        Plan::Math { bindings, .. } => bindings.values().cloned().collect(),
        Plan::MinMax { keys, .. } | Plan::Sum { keys } => keys.clone(),
        Plan::WeightedRank { terms } => terms.iter().map(|t| t.key.clone()).collect(),
        Plan::Where { cycle, .. } => vec![cycle.clone()],
        Plan::Ratio {
            numerator,
            denominator,
            ..
        } => vec![numerator.clone(), denominator.clone()],
    }
}

/// Dependency cycles among compiled stats, each as a closed path
///
/// Depth-first search with a visiting stack; every back edge yields the
/// stack segment from the revisited node.
fn find_cycles(stats: &[CompiledStat]) -> Vec<Vec<NamespacedKey>> {
    let graph: HashMap<&NamespacedKey, &[NamespacedKey]> = stats
        .iter()
        .map(|stat| (&stat.key, stat.dependencies.as_slice()))
        .collect();

    let mut cycles = Vec::new();
    let mut done: HashSet<&NamespacedKey> = HashSet::new();
    let mut stack: Vec<&NamespacedKey> = Vec::new();

    fn visit<'a>(
        key: &'a NamespacedKey,
        graph: &HashMap<&'a NamespacedKey, &'a [NamespacedKey]>,
        done: &mut HashSet<&'a NamespacedKey>,
        stack: &mut Vec<&'a NamespacedKey>,
        cycles: &mut Vec<Vec<NamespacedKey>>,
    ) {
        if let Some(start) = stack.iter().position(|k| *k == key) {
            let mut cycle: Vec<NamespacedKey> = stack[start..].iter().map(|k| (*k).clone()).collect();
            cycle.push(key.clone());
            cycles.push(cycle);
            return;
        }
        if done.contains(key) {
            return;
        }

        stack.push(key);
        for dep in graph.get(key).copied().unwrap_or(&[]) {
            visit(dep, graph, done, stack, cycles);
        }
        stack.pop();
        done.insert(key);
    }

    for stat in stats {
        visit(&stat.key, &graph, &mut done, &mut stack, &mut cycles);
    }
    cycles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{FieldDefinition, FmsImport};
    use serde_json::json;

    fn resolver() -> KeyResolver {
        let fields: Vec<FieldDefinition> = serde_json::from_value(json!([
            {"id": "a", "name": "A", "type": "number"},
            {"id": "b", "name": "B", "type": "number"},
            {"id": "notes", "name": "Notes", "type": "text"},
            {"id": "climb", "name": "Climb", "type": "select", "options": ["None", "Park", "Hang"]},
            {"id": "shots", "name": "Shots", "type": "cycle"},
            {"id": "goal", "name": "Goal", "type": "select", "options": ["Low", "High"], "cycle": "shots"},
            {"id": "made", "name": "Made", "type": "boolean", "cycle": "shots"}
        ]))
        .unwrap();
        KeyResolver::new(&fields, FmsImport::default())
    }

    fn defs(value: serde_json::Value) -> Vec<SmartStatDefinition> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_valid_definitions_compile() {
        let mut resolver = resolver();
        let report = compile_definitions(
            &defs(json!([
                {"id": "pct", "type": "math", "math": "a / b * 100"},
                {"id": "double", "type": "math", "math": "pct * 2"},
                {"id": "high", "type": "where", "cycle": "shots", "conditions": {"goal": "High", "made": "Yes"}},
                {"id": "parks", "type": "filter", "filter": "climb", "compare": "=", "value": "Park"}
            ])),
            &mut resolver,
        );

        assert!(report.is_valid(), "{:?}", report.errors);
        assert_eq!(report.compiled.len(), 4);
        assert_eq!(report.compiled[1].dependencies, vec![NamespacedKey::smart("pct")]);
        assert!(resolver.parse("smart.double").is_ok());
    }

    #[test]
    fn test_cycle_marks_both_invalid() {
        let mut resolver = resolver();
        let report = compile_definitions(
            &defs(json!([
                {"id": "x", "type": "math", "math": "smart.y + 1"},
                {"id": "y", "type": "math", "math": "smart.x + 1"},
                {"id": "z", "type": "math", "math": "a + 1"}
            ])),
            &mut resolver,
        );

        let mut invalid = report.invalid_ids();
        invalid.sort();
        assert_eq!(invalid, vec!["x", "y"]);
        assert_eq!(report.compiled.len(), 1);
        assert!(resolver.parse("smart.x").is_err());
        assert!(resolver.parse("smart.y").is_err());
        assert!(resolver.parse("smart.z").is_ok());
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let mut resolver = resolver();
        let report = compile_definitions(
            &defs(json!([{"id": "me", "type": "sum", "keys": ["smart.me", "a"]}])),
            &mut resolver,
        );
        assert_eq!(report.invalid_ids(), vec!["me"]);
        assert!(report.errors[0].reason.contains("circular"));
    }

    #[test]
    fn test_errors_collected_not_first_failure() {
        let mut resolver = resolver();
        let report = compile_definitions(
            &defs(json!([
                {"id": "bad_key", "type": "math", "math": "nope + 1"},
                {"id": "bad_math", "type": "math", "math": "a + "},
                {"id": "text", "type": "sum", "keys": ["notes"]},
                {"id": "option", "type": "filter", "filter": "climb", "compare": "=", "value": "Fly"},
                {"id": "uses_bad", "type": "ratio", "numerator": "smart.bad_key", "denominator": "b"},
                {"id": "bad_key", "type": "math", "math": "a"}
            ])),
            &mut resolver,
        );

        assert!(report.compiled.is_empty());
        let ids: Vec<&str> = report.errors.iter().map(|e| e.id.as_str()).collect();
        for id in ["bad_key", "bad_math", "text", "option", "uses_bad"] {
            assert!(ids.contains(&id), "{} should be reported", id);
        }
    }

    #[test]
    fn test_where_requires_in_cycle_inputs() {
        let mut resolver = resolver();
        let report = compile_definitions(
            &defs(json!([
                {"id": "w", "type": "where", "cycle": "shots", "conditions": {"climb": "Park"}}
            ])),
            &mut resolver,
        );
        assert_eq!(report.invalid_ids(), vec!["w"]);
    }
}
