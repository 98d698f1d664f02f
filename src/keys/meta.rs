//! Metadata describing what a key holds.

use super::key::NamespacedKey;
use crate::aggregator::{Value, ValueKind};
use crate::parser::schema::{FieldKind, Negative, RawValue, ScoutMode};
use serde::Serialize;

/// Metadata for one resolvable key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMeta {
    #[serde(serialize_with = "serialize_key")]
    pub key: NamespacedKey,
    pub name: String,
    pub kind: FieldKind,
    pub options: Vec<String>,
    pub negative: Negative,
    pub mode: ScoutMode,
    /// Id of the cyclic column this input repeats inside
    pub cycle: Option<String>,
}

fn serialize_key<S: serde::Serializer>(key: &NamespacedKey, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(key)
}

impl FieldMeta {
    pub fn new(key: NamespacedKey, name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            key,
            name: name.into(),
            kind,
            options: Vec::new(),
            negative: Negative::default(),
            mode: ScoutMode::Match,
            cycle: None,
        }
    }

    /// How values of this key aggregate
    pub fn value_kind(&self) -> ValueKind {
        match self.kind {
            FieldKind::Boolean => ValueKind::Boolean,
            FieldKind::Select | FieldKind::Dropdown | FieldKind::Multiselect => {
                ValueKind::Enumerated {
                    options: self.options.len(),
                }
            }
            FieldKind::String | FieldKind::Text => ValueKind::Text,
            FieldKind::Cycle => ValueKind::Cycle,
            FieldKind::Counter
            | FieldKind::Multicounter
            | FieldKind::Number
            | FieldKind::Slider => ValueKind::Numeric,
        }
    }

    /// Whether a lower value is better, for the key's option if narrowed
    pub fn is_negative(&self, option: Option<usize>) -> bool {
        self.negative.is_negative(option)
    }

    /// Whether this input lives inside a cyclic column
    pub fn in_cycle(&self) -> bool {
        self.cycle.is_some()
    }

    /// Index of an option by label (case-insensitive)
    pub fn option_index(&self, label: &str) -> Option<usize> {
        self.options
            .iter()
            .position(|option| option.eq_ignore_ascii_case(label))
    }

    /// Interpret a stored raw value according to this field's kind
    pub fn decode(&self, raw: &RawValue) -> Value {
        match (self.kind, raw) {
            (FieldKind::Cycle, RawValue::Cycles(entries)) => Value::Cycles(entries.clone()),
            (FieldKind::Cycle, RawValue::Flags(flags)) if flags.is_empty() => Value::Cycles(Vec::new()),

            (FieldKind::Boolean, RawValue::Bool(b)) => Value::Bool(*b),
            (FieldKind::Boolean, RawValue::Integer(i)) => Value::Bool(*i != 0),

            (FieldKind::Multiselect, RawValue::Flags(flags)) => Value::Flags(flags.clone()),
            (kind, RawValue::Integer(i)) if kind.is_enumerated() => usize::try_from(*i)
                .ok()
                .filter(|index| *index < self.options.len())
                .map_or(Value::Missing, Value::Choice),
            (kind, RawValue::Text(label)) if kind.is_enumerated() => self
                .option_index(label)
                .map_or(Value::Missing, Value::Choice),

            (FieldKind::String | FieldKind::Text, RawValue::Text(s)) => Value::Text(s.clone()),

            (kind, RawValue::Integer(i)) if kind.is_numeric() => Value::Number(*i as f64),
            (kind, RawValue::Float(n)) if kind.is_numeric() => Value::Number(*n),
            (kind, RawValue::Bool(b)) if kind.is_numeric() => Value::Number(if *b { 1.0 } else { 0.0 }),
            (kind, RawValue::Text(s)) if kind.is_numeric() => {
                s.trim().parse::<f64>().map_or(Value::Missing, Value::Number)
            }

            // Shape does not match the current config: treat as absent
            _ => Value::Missing,
        }
    }
}

/// Infer metadata for an opaque imported value
pub fn infer_kind(raw: &RawValue) -> FieldKind {
    match raw {
        RawValue::Bool(_) => FieldKind::Boolean,
        RawValue::Integer(_) | RawValue::Float(_) => FieldKind::Number,
        RawValue::Text(_) => FieldKind::String,
        RawValue::Flags(_) | RawValue::Cycles(_) => FieldKind::Text,
    }
}

/// Title-case an id for display (`auto_points` -> `Auto Points`)
pub fn title_case(id: &str) -> String {
    id.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select() -> FieldMeta {
        let mut meta = FieldMeta::new(NamespacedKey::result("climb"), "Climb", FieldKind::Select);
        meta.options = vec!["None".into(), "Park".into(), "Hang".into()];
        meta
    }

    #[test]
    fn test_decode_enumerated() {
        let meta = select();
        assert_eq!(meta.decode(&RawValue::Integer(2)), Value::Choice(2));
        assert_eq!(meta.decode(&RawValue::Text("park".into())), Value::Choice(1));
        assert_eq!(meta.decode(&RawValue::Text("fly".into())), Value::Missing);
        assert_eq!(meta.value_kind(), ValueKind::Enumerated { options: 3 });
    }

    #[test]
    fn test_decode_out_of_range_option_is_missing() {
        let meta = select();
        assert_eq!(meta.decode(&RawValue::Integer(3)), Value::Missing);
        assert_eq!(meta.decode(&RawValue::Integer(-1)), Value::Missing);
        assert_eq!(meta.decode(&RawValue::Integer(i64::MAX)), Value::Missing);
    }

    #[test]
    fn test_decode_mismatched_shape_is_missing() {
        let meta = FieldMeta::new(NamespacedKey::result("n"), "N", FieldKind::Counter);
        assert_eq!(meta.decode(&RawValue::Flags(vec![true])), Value::Missing);
        assert_eq!(meta.decode(&RawValue::Text("4".into())), Value::Number(4.0));
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("auto_high_goal"), "Auto High Goal");
        assert_eq!(title_case("rank"), "Rank");
    }
}
