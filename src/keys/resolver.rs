//! Key resolution: metadata lookup and raw value reads.
//!
//! `result.*` keys read the subject's latest non-ignored record,
//! `fms.*` keys read imported official results, `meta.*` keys read team
//! identity, and `smart.*` keys are handed to a [`SmartSource`].

use super::key::{Namespace, NamespacedKey};
use super::meta::{infer_kind, title_case, FieldMeta};
use crate::aggregator::{AggregateFn, Value};
use crate::parser::schema::{
    match_order, CycleEntry, FieldDefinition, FieldKind, FmsImport, Negative, ResultRecord,
    ScoutMode, Subject,
};
use crate::store::Snapshot;
use crate::utils::error::StatError;
use log::debug;
use std::collections::HashMap;

/// Identity attributes exposed under `meta.*`
const META_KEYS: &[(&str, &str, FieldKind)] = &[
    ("team", "Team Number", FieldKind::Number),
    ("name", "Team Name", FieldKind::String),
    ("city", "City", FieldKind::String),
    ("state_prov", "State", FieldKind::String),
    ("country", "Country", FieldKind::String),
    ("match_key", "Match", FieldKind::String),
    ("position", "Position", FieldKind::Number),
    ("scouter", "Scouter", FieldKind::String),
];

/// Provider of derived (`smart.*`) values
pub trait SmartSource {
    /// Value of a smart stat for a subject
    fn smart_value(&mut self, key: &NamespacedKey, subject: &Subject) -> Result<Value, StatError>;
}

/// Resolves namespaced keys to metadata and values
#[derive(Debug, Clone, Default)]
pub struct KeyResolver {
    metas: HashMap<NamespacedKey, FieldMeta>,
    /// Registration order, for listing
    order: Vec<NamespacedKey>,
    fms: FmsImport,
}

impl KeyResolver {
    /// Build a resolver over configured fields and imported official results
    ///
    /// Smart stats are registered separately once validated.
    pub fn new(fields: &[FieldDefinition], fms: FmsImport) -> Self {
        let mut resolver = KeyResolver::default();

        for field in fields {
            for meta in expand_field(field) {
                resolver.insert(meta);
            }
        }

        for id in fms.key_ids() {
            let info = fms.fields.get(&id).cloned().unwrap_or_default();
            let kind = fms.sample(&id).map_or(FieldKind::Number, infer_kind);
            let mut meta = FieldMeta::new(
                NamespacedKey::new(Namespace::Fms, id.clone()),
                info.name.unwrap_or_else(|| title_case(&id)),
                kind,
            );
            meta.negative = Negative::Scalar(info.negative);
            resolver.insert(meta);
        }

        for (id, name, kind) in META_KEYS {
            resolver.insert(FieldMeta::new(NamespacedKey::new(Namespace::Meta, *id), *name, *kind));
        }

        resolver.fms = fms;
        debug!("Key resolver holds {} keys", resolver.order.len());
        resolver
    }

    fn insert(&mut self, meta: FieldMeta) {
        let key = meta.key.clone();
        if self.metas.insert(key.clone(), meta).is_none() {
            self.order.push(key);
        }
    }

    /// Register a smart stat's metadata
    pub fn register_smart(&mut self, id: &str, name: &str, negative: bool) {
        let mut meta = FieldMeta::new(NamespacedKey::smart(id), name, FieldKind::Number);
        meta.negative = Negative::Scalar(negative);
        self.insert(meta);
    }

    /// Drop a key (used to withdraw invalid smart stats)
    pub fn remove(&mut self, key: &NamespacedKey) {
        if self.metas.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
    }

    /// Parse a key string and confirm it resolves
    pub fn parse(&self, key: &str) -> Result<NamespacedKey, StatError> {
        let parsed: NamespacedKey = key.parse()?;
        self.resolve(&parsed)?;
        Ok(parsed)
    }

    /// Metadata for a key
    ///
    /// # Errors
    /// * `StatError::UnknownKey` - No definition matches
    pub fn resolve(&self, key: &NamespacedKey) -> Result<&FieldMeta, StatError> {
        let meta = self
            .metas
            .get(&key.base())
            .ok_or_else(|| StatError::UnknownKey(key.to_string()))?;
        match key.option {
            Some(option) if option >= meta.options.len() => Err(StatError::UnknownKey(key.to_string())),
            _ => Ok(meta),
        }
    }

    /// Resolve a reference written in a smart stat definition
    ///
    /// Fully namespaced references must resolve as written. A bare id
    /// tries `result.`, then `smart.`, then `fms.`.
    pub fn resolve_reference(&self, reference: &str) -> Result<NamespacedKey, StatError> {
        let reference = reference.trim();
        if reference.contains('.') {
            return self.parse(reference);
        }
        [Namespace::Result, Namespace::Smart, Namespace::Fms]
            .into_iter()
            .map(|ns| NamespacedKey::new(ns, reference))
            .find(|key| self.metas.contains_key(key))
            .ok_or_else(|| StatError::UnknownKey(reference.to_string()))
    }

    /// List keys, optionally filtered by namespace and field kinds
    pub fn keys(&self, namespace: Option<Namespace>, kinds: &[FieldKind]) -> Vec<&FieldMeta> {
        self.order
            .iter()
            .filter_map(|key| self.metas.get(key))
            .filter(|meta| namespace.map_or(true, |ns| meta.key.namespace == ns))
            .filter(|meta| kinds.is_empty() || kinds.contains(&meta.kind))
            .collect()
    }

    /// Friendly name, prefixed with the aggregation when one is given
    pub fn display_name(&self, key: &NamespacedKey, func: Option<AggregateFn>) -> String {
        let mut name = match self.resolve(key) {
            Ok(meta) => {
                let option = key.option.and_then(|i| meta.options.get(i));
                match option {
                    Some(label) => format!("{} {}", meta.name, label),
                    None => meta.name.clone(),
                }
            }
            Err(_) => title_case(&key.id),
        };
        if let Some(func) = func {
            name = format!("{} {}", title_case(func.as_str()), name);
        }
        name
    }

    /// Read the value of a key for a subject
    ///
    /// **Public** - main entry point for raw reads
    ///
    /// # Arguments
    /// * `snapshot` - Current record snapshot
    /// * `smart` - Evaluator for `smart.*` keys
    /// * `key` - Key to read
    /// * `subject` - Team or match-team
    /// * `cycle_index` - For cyclic inputs, a single repetition
    ///
    /// # Returns
    /// The value, `Value::List` of per-match values when a team subject
    /// reads a per-match key, or `Value::Missing`
    pub fn read(
        &self,
        snapshot: &Snapshot,
        smart: &mut dyn SmartSource,
        key: &NamespacedKey,
        subject: &Subject,
        cycle_index: Option<usize>,
    ) -> Result<Value, StatError> {
        let meta = self.resolve(key)?;
        let value = match key.namespace {
            Namespace::Result => read_result(snapshot, meta, subject, cycle_index),
            Namespace::Fms => self.read_fms(meta, subject),
            Namespace::Meta => read_meta(snapshot, &key.id, subject),
            Namespace::Smart => smart.smart_value(&key.base(), subject)?,
        };
        Ok(value)
    }

    /// Imported value for a subject; team subjects fall back to per-match values
    fn read_fms(&self, meta: &FieldMeta, subject: &Subject) -> Value {
        let id = &meta.key.id;
        let team_value = || {
            self.fms
                .teams
                .get(&subject.team)
                .and_then(|values| values.get(id))
                .map(|raw| meta.decode(raw))
        };

        if let Some(match_key) = &subject.match_key {
            return self
                .fms
                .matches
                .get(match_key)
                .and_then(|teams| teams.get(&subject.team))
                .and_then(|values| values.get(id))
                .map(|raw| meta.decode(raw))
                .or_else(team_value)
                .unwrap_or(Value::Missing);
        }

        if let Some(value) = team_value() {
            return value;
        }

        let mut per_match: Vec<(&String, Value)> = self
            .fms
            .matches
            .iter()
            .filter_map(|(match_key, teams)| {
                let raw = teams.get(&subject.team)?.get(id)?;
                Some((match_key, meta.decode(raw)))
            })
            .collect();
        if per_match.is_empty() {
            return Value::Missing;
        }
        per_match.sort_by_key(|(match_key, _)| match_order(match_key));
        Value::List(per_match.into_iter().map(|(_, v)| v).collect())
    }
}

/// Split a configured field into resolvable keys (multicounters expand per option)
fn expand_field(field: &FieldDefinition) -> Vec<FieldMeta> {
    if field.kind == FieldKind::Multicounter {
        return field
            .options
            .iter()
            .enumerate()
            .map(|(i, option)| {
                let suffix = option.to_lowercase().replace(' ', "_");
                let mut meta = FieldMeta::new(
                    NamespacedKey::result(format!("{}_{}", field.id, suffix)),
                    format!("{} {}", field.name, option),
                    FieldKind::Counter,
                );
                meta.negative = Negative::Scalar(field.negative.is_negative(Some(i)));
                meta.mode = field.mode;
                meta.cycle = field.cycle.clone();
                meta
            })
            .collect();
    }

    let mut meta = FieldMeta::new(NamespacedKey::result(field.id.clone()), field.name.clone(), field.kind);
    meta.options = match field.kind {
        FieldKind::Boolean => vec!["false".to_string(), "true".to_string()],
        _ => field.options.clone(),
    };
    meta.negative = field.negative.clone();
    meta.mode = field.mode;
    meta.cycle = field.cycle.clone();
    vec![meta]
}

/// Raw scouted value for a subject
fn read_result(
    snapshot: &Snapshot,
    meta: &FieldMeta,
    subject: &Subject,
    cycle_index: Option<usize>,
) -> Value {
    if meta.mode == ScoutMode::Pit {
        return snapshot
            .pit_record(subject.team)
            .map_or(Value::Missing, |record| read_in_record(record, meta, cycle_index));
    }

    match &subject.match_key {
        Some(match_key) => snapshot
            .match_record(subject.team, match_key)
            .map_or(Value::Missing, |record| read_in_record(record, meta, cycle_index)),
        None => Value::List(
            snapshot
                .match_keys(subject.team)
                .iter()
                .filter_map(|key| snapshot.match_record(subject.team, key))
                .map(|record| read_in_record(record, meta, cycle_index))
                .collect(),
        ),
    }
}

/// Field value inside one record
fn read_in_record(record: &ResultRecord, meta: &FieldMeta, cycle_index: Option<usize>) -> Value {
    let id = &meta.key.id;

    if let Some(column) = &meta.cycle {
        let Some(entries) = record.fields.get(column).map(|raw| raw.cycles()) else {
            return Value::Missing;
        };
        let decode_entry = |entry: &CycleEntry| {
            entry.get(id).map_or(Value::Missing, |raw| meta.decode(raw))
        };
        return match cycle_index {
            Some(index) => entries.get(index).map_or(Value::Missing, decode_entry),
            None => Value::List(entries.iter().map(decode_entry).collect()),
        };
    }

    let Some(raw) = record.fields.get(id) else {
        return Value::Missing;
    };
    match (meta.decode(raw), cycle_index) {
        (Value::Cycles(entries), Some(index)) => entries
            .get(index)
            .map_or(Value::Missing, |entry| Value::Cycles(vec![entry.clone()])),
        (value, _) => value,
    }
}

/// Identity attribute for a subject
fn read_meta(snapshot: &Snapshot, id: &str, subject: &Subject) -> Value {
    let text = |s: &str| {
        if s.is_empty() {
            Value::Missing
        } else {
            Value::Text(s.to_string())
        }
    };
    let info = snapshot.team_info(subject.team);
    let record = subject
        .match_key
        .as_deref()
        .and_then(|key| snapshot.match_record(subject.team, key));

    match id {
        "team" => Value::Number(f64::from(subject.team)),
        "name" => info.map_or(Value::Missing, |i| text(&i.name)),
        "city" => info.map_or(Value::Missing, |i| text(&i.city)),
        "state_prov" => info.map_or(Value::Missing, |i| text(&i.state_prov)),
        "country" => info.map_or(Value::Missing, |i| text(&i.country)),
        "match_key" => subject.match_key.as_deref().map_or(Value::Missing, text),
        "position" => subject
            .position
            .or_else(|| record.and_then(|r| r.position))
            .map_or(Value::Missing, |p| Value::Number(f64::from(p))),
        "scouter" => record
            .and_then(|r| r.scouter.as_deref())
            .map_or(Value::Missing, text),
        _ => Value::Missing,
    }
}
