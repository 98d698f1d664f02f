//! Smart stat evaluation.
//!
//! An [`Evaluation`] is created per top-level call. It memoizes smart
//! values per (stat, subject) and tracks the stats currently being
//! evaluated, so both the cache and the cycle guard die with the call and
//! never outlive a snapshot.

use super::definition::Extreme;
use super::validation::{CompiledStat, Plan};
use crate::aggregator::{aggregate, aggregate_option, mean, Aggregate, AggregateFn, Value};
use crate::keys::{FieldMeta, KeyResolver, NamespacedKey, SmartSource};
use crate::parser::schema::{CycleEntry, Subject, TeamNumber};
use crate::store::Snapshot;
use crate::utils::error::StatError;
use log::{debug, trace};
use std::collections::HashMap;

/// Holds the validated smart stats of a configuration
#[derive(Debug, Clone, Default)]
pub struct SmartStatEngine {
    stats: HashMap<NamespacedKey, CompiledStat>,
    /// Configuration order
    order: Vec<NamespacedKey>,
}

impl SmartStatEngine {
    pub fn new(compiled: Vec<CompiledStat>) -> Self {
        let order = compiled.iter().map(|stat| stat.key.clone()).collect();
        let stats = compiled
            .into_iter()
            .map(|stat| (stat.key.clone(), stat))
            .collect();
        Self { stats, order }
    }

    pub fn get(&self, key: &NamespacedKey) -> Option<&CompiledStat> {
        self.stats.get(&key.base())
    }

    /// Valid stats in configuration order
    pub fn stats(&self) -> impl Iterator<Item = &CompiledStat> {
        self.order.iter().filter_map(|key| self.stats.get(key))
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Start an evaluation over a snapshot
    pub fn evaluation<'a>(
        &'a self,
        snapshot: &'a Snapshot,
        resolver: &'a KeyResolver,
        default_function: AggregateFn,
    ) -> Evaluation<'a> {
        Evaluation {
            engine: self,
            snapshot,
            resolver,
            default_function,
            memo: HashMap::new(),
            visiting: Vec::new(),
        }
    }

    /// Evaluate one smart stat for a subject
    ///
    /// # Returns
    /// `Value::Number`, `Value::List` of per-match numbers for a team
    /// subject of a per-match stat, or `Value::Missing` when an operand
    /// had no value
    pub fn evaluate(
        &self,
        snapshot: &Snapshot,
        resolver: &KeyResolver,
        default_function: AggregateFn,
        key: &NamespacedKey,
        subject: &Subject,
    ) -> Result<Value, StatError> {
        self.evaluation(snapshot, resolver, default_function)
            .smart_value(key, subject)
    }
}

/// Where a plan is evaluated
#[derive(Debug, Clone)]
enum Scope {
    Match(Subject),
    Team(TeamNumber),
}

impl Scope {
    fn subject(&self) -> Subject {
        match self {
            Scope::Match(subject) => subject.clone(),
            Scope::Team(team) => Subject::team(*team),
        }
    }

    fn team(&self) -> TeamNumber {
        match self {
            Scope::Match(subject) => subject.team,
            Scope::Team(team) => *team,
        }
    }
}

/// State of a single evaluation call
pub struct Evaluation<'a> {
    engine: &'a SmartStatEngine,
    snapshot: &'a Snapshot,
    resolver: &'a KeyResolver,
    default_function: AggregateFn,
    memo: HashMap<(NamespacedKey, Subject), Value>,
    visiting: Vec<NamespacedKey>,
}

impl SmartSource for Evaluation<'_> {
    fn smart_value(&mut self, key: &NamespacedKey, subject: &Subject) -> Result<Value, StatError> {
        let engine = self.engine;
        let stat = engine
            .get(key)
            .ok_or_else(|| StatError::UnknownKey(key.to_string()))?;

        let subject = if stat.is_team_scoped() {
            subject.to_team()
        } else {
            subject.clone()
        };
        let memo_key = (stat.key.clone(), subject);
        if let Some(value) = self.memo.get(&memo_key) {
            return Ok(value.clone());
        }

        if self.visiting.contains(&stat.key) {
            let mut path: Vec<String> = self.visiting.iter().map(|k| k.to_string()).collect();
            path.push(stat.key.to_string());
            return Err(StatError::CircularDependency(path));
        }

        self.visiting.push(stat.key.clone());
        let result = self.compute(stat, &memo_key.1);
        self.visiting.pop();

        let value = result?;
        self.memo.insert(memo_key, value.clone());
        Ok(value)
    }
}

impl<'a> Evaluation<'a> {
    /// Evaluate a stat for a subject according to its scope
    fn compute(&mut self, stat: &'a CompiledStat, subject: &Subject) -> Result<Value, StatError> {
        if stat.is_team_scoped() {
            return self.settle(stat, Scope::Team(subject.team));
        }
        if subject.is_match() {
            return self.settle(stat, Scope::Match(subject.clone()));
        }

        let snapshot = self.snapshot;
        let mut values = Vec::new();
        for match_subject in snapshot.match_subjects(subject.team) {
            values.push(self.settle(stat, Scope::Match(match_subject))?);
        }
        Ok(Value::List(values))
    }

    /// Run a plan, turning missing operands into `Value::Missing`
    fn settle(&mut self, stat: &'a CompiledStat, scope: Scope) -> Result<Value, StatError> {
        match self.run(stat, &scope) {
            Ok(value) => Ok(Value::Number(value)),
            Err(StatError::MissingOperand(reason)) => {
                trace!("{} has no value for {}: {}", stat.key, scope.subject(), reason);
                Ok(Value::Missing)
            }
            Err(e) => Err(e),
        }
    }

    fn run(&mut self, stat: &'a CompiledStat, scope: &Scope) -> Result<f64, StatError> {
        match &stat.plan {
            Plan::Math { expr, bindings } => expr.eval(&mut |name: &str| {
                let key = bindings
                    .get(name)
                    .ok_or_else(|| StatError::UnknownKey(name.to_string()))?;
                self.scalar(key, scope)
            }),

            Plan::Sum { keys } => {
                let mut total = 0.0;
                for key in keys {
                    total += self.scalar(key, scope)?;
                }
                Ok(total)
            }

            Plan::Ratio {
                numerator,
                denominator,
                percent,
            } => {
                // Totals pool every observation in scope before dividing
                let top = self.scalar_with(numerator, scope, AggregateFn::Total)?;
                let bottom = self.scalar_with(denominator, scope, AggregateFn::Total)?;
                let divisor = if *percent { top + bottom } else { bottom };
                if divisor == 0.0 {
                    return Err(StatError::MissingOperand(format!("{} is zero", denominator)));
                }
                Ok(top / divisor)
            }

            Plan::MinMax { extreme, keys } => {
                let func = match extreme {
                    Extreme::Min => AggregateFn::Min,
                    Extreme::Max => AggregateFn::Max,
                };
                let mut best: Option<f64> = None;
                for key in keys {
                    let observed = self.observe(key, scope)?;
                    if let Some(value) = self.aggregate_key(key, &[observed], func)?.as_f64() {
                        best = Some(match (best, extreme) {
                            (None, _) => value,
                            (Some(b), Extreme::Min) => b.min(value),
                            (Some(b), Extreme::Max) => b.max(value),
                        });
                    }
                }
                best.ok_or_else(|| StatError::MissingOperand("no observations".to_string()))
            }

            Plan::Map {
                key,
                values,
                scale,
                offset,
            } => {
                let observed = self.observe(key, scope)?;
                let mapped: Vec<f64> = Value::flatten(std::slice::from_ref(&observed))
                    .into_iter()
                    .filter_map(|value| map_observation(value, key.option, values, *scale, *offset))
                    .collect();
                mean(&mapped).ok_or_else(|| StatError::MissingOperand(key.to_string()))
            }

            Plan::Filter {
                key,
                filter,
                compare,
                threshold,
            } => match scope {
                Scope::Match(_) => {
                    let value = self.scalar_with(filter, scope, AggregateFn::Mean)?;
                    let passes = compare.holds(value, *threshold);
                    match (key, passes) {
                        (None, _) => Ok(if passes { 1.0 } else { 0.0 }),
                        (Some(key), true) => self.scalar(key, scope),
                        (Some(_), false) => {
                            Err(StatError::MissingOperand(format!("{} filtered out", filter)))
                        }
                    }
                }
                Scope::Team(team) => {
                    let snapshot = self.snapshot;
                    let subjects = snapshot.match_subjects(*team);
                    if subjects.is_empty() {
                        return Err(StatError::MissingOperand("no matches".to_string()));
                    }

                    let mut count = 0.0;
                    let mut kept = Vec::new();
                    for subject in subjects {
                        let in_match = Scope::Match(subject);
                        let value = match self.scalar_with(filter, &in_match, AggregateFn::Mean) {
                            Ok(value) => value,
                            Err(StatError::MissingOperand(_)) => continue,
                            Err(e) => return Err(e),
                        };
                        if !compare.holds(value, *threshold) {
                            continue;
                        }
                        count += 1.0;
                        if let Some(key) = key {
                            kept.push(self.observe(key, &in_match)?);
                        }
                    }

                    match key {
                        None => Ok(count),
                        Some(key) => {
                            let func = stat.definition.function.unwrap_or(self.default_function);
                            self.aggregate_key(key, &kept, func)?
                                .as_f64()
                                .ok_or_else(|| StatError::MissingOperand(key.to_string()))
                        }
                    }
                }
            },

            Plan::WeightedRank { terms } => {
                let team = scope.team();
                let snapshot = self.snapshot;
                let mut score = 0.0;
                let mut weights = 0.0;

                for term in terms {
                    let (mut low, mut high) = (f64::INFINITY, f64::NEG_INFINITY);
                    let mut own = None;
                    for &other in snapshot.teams() {
                        match self.scalar(&term.key, &Scope::Team(other)) {
                            Ok(value) => {
                                low = low.min(value);
                                high = high.max(value);
                                if other == team {
                                    own = Some(value);
                                }
                            }
                            Err(StatError::MissingOperand(_)) => {}
                            Err(e) => return Err(e),
                        }
                    }

                    let value = own.ok_or_else(|| StatError::MissingOperand(term.key.to_string()))?;
                    let normalized = if high > low {
                        let n = (value - low) / (high - low);
                        if term.negative {
                            1.0 - n
                        } else {
                            n
                        }
                    } else {
                        1.0
                    };
                    score += term.weight * normalized;
                    weights += term.weight.abs();
                }

                if weights == 0.0 {
                    return Err(StatError::MissingOperand("weights sum to zero".to_string()));
                }
                Ok(score / weights)
            }

            Plan::Where {
                cycle,
                conditions,
                sum,
                denominator,
            } => {
                let observed = self.observe(cycle, scope)?;
                let columns = Value::flatten(std::slice::from_ref(&observed));
                if columns.is_empty() {
                    return Err(StatError::MissingOperand(cycle.to_string()));
                }

                let (mut value, mut rest) = (0.0, 0.0);
                let entries = columns.into_iter().flat_map(|column| match column {
                    Value::Cycles(entries) => entries.as_slice(),
                    _ => &[],
                });
                for entry in entries {
                    let passes = conditions.iter().all(|(meta, target)| {
                        entry
                            .get(&meta.key.id)
                            .and_then(|raw| meta.decode(raw).as_f64())
                            == Some(*target)
                    });
                    if !passes {
                        continue;
                    }
                    value += sum.as_ref().map_or(1.0, |meta| entry_number(entry, meta));
                    if let Some(meta) = denominator {
                        rest += entry_number(entry, meta);
                    }
                }

                match denominator {
                    None => Ok(value),
                    Some(meta) if value + rest == 0.0 => {
                        Err(StatError::MissingOperand(format!("{} is zero", meta.key)))
                    }
                    Some(_) => Ok(value / (value + rest)),
                }
            }
        }
    }

    /// Raw observation(s) of a key in scope
    fn observe(&mut self, key: &NamespacedKey, scope: &Scope) -> Result<Value, StatError> {
        let resolver = self.resolver;
        let snapshot = self.snapshot;
        resolver.read(snapshot, self, key, &scope.subject(), None)
    }

    fn aggregate_key(
        &self,
        key: &NamespacedKey,
        values: &[Value],
        func: AggregateFn,
    ) -> Result<Aggregate, StatError> {
        let meta = self.resolver.resolve(key)?;
        Ok(match key.option {
            Some(option) => aggregate_option(values, func, option),
            None => aggregate(values, func, meta.value_kind()),
        })
    }

    /// A key's single number in scope, using its default aggregation
    fn scalar(&mut self, key: &NamespacedKey, scope: &Scope) -> Result<f64, StatError> {
        let func = self
            .engine
            .get(key)
            .and_then(|stat| stat.definition.function)
            .unwrap_or(self.default_function);
        self.scalar_with(key, scope, func)
    }

    fn scalar_with(
        &mut self,
        key: &NamespacedKey,
        scope: &Scope,
        func: AggregateFn,
    ) -> Result<f64, StatError> {
        let observed = self.observe(key, scope)?;
        let result = self.aggregate_key(key, &[observed], func)?.as_f64();
        if result.is_none() {
            debug!("{} has no {} for {}", key, func, scope.subject());
        }
        result.ok_or_else(|| StatError::MissingOperand(key.to_string()))
    }
}

/// Map one observation through a lookup table or linear transform
fn map_observation(
    value: &Value,
    option: Option<usize>,
    table: &[f64],
    scale: f64,
    offset: f64,
) -> Option<f64> {
    let linear = |n: f64| n * scale + offset;
    let indicator = |chosen: bool| linear(if chosen { 1.0 } else { 0.0 });
    match (value, option) {
        (Value::Choice(i), Some(o)) => Some(indicator(*i == o)),
        (Value::Flags(flags), Some(o)) => Some(indicator(flags.get(o).copied().unwrap_or(false))),
        (Value::Choice(i), None) => table.get(*i).copied(),
        (Value::Bool(b), None) if !table.is_empty() => table.get(usize::from(*b)).copied(),
        (other, _) => other.as_f64().map(linear),
    }
}

/// Numeric value of an in-cycle input, absent counting as zero
fn entry_number(entry: &CycleEntry, meta: &FieldMeta) -> f64 {
    entry
        .get(&meta.key.id)
        .and_then(|raw| meta.decode(raw).as_f64())
        .unwrap_or(0.0)
}
