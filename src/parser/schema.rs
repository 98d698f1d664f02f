//! Input schema definitions for scouting data.
//!
//! This module defines the shape of the JSON we read: scouted result
//! records, the field/smart-stat configuration, the event team list and
//! imported official results.

use crate::smart::SmartStatDefinition;
use crate::utils::config::MATCH_LEVELS;
use crate::utils::error::InvalidDefinitionError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Team identifier (the team's competition number)
pub type TeamNumber = u32;

/// One repetition of a cyclic column: input id -> value
pub type CycleEntry = BTreeMap<String, RawValue>;

/// Scouting mode a record or field belongs to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoutMode {
    #[default]
    Match,
    Pit,
}

/// A raw scouted value as stored in a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    /// Multiselect: one flag per option
    Flags(Vec<bool>),
    /// Cyclic column: chronological sub-records
    Cycles(Vec<CycleEntry>),
}

impl RawValue {
    /// Cycle entries of a cyclic column (empty arrays decode as `Flags`)
    pub fn cycles(&self) -> &[CycleEntry] {
        match self {
            RawValue::Cycles(entries) => entries,
            _ => &[],
        }
    }
}

/// The team, or team-in-a-match, a value is resolved for
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Subject {
    pub team: TeamNumber,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u8>,
}

impl Subject {
    pub fn team(team: TeamNumber) -> Self {
        Self {
            team,
            match_key: None,
            position: None,
        }
    }

    pub fn match_team(team: TeamNumber, match_key: impl Into<String>) -> Self {
        Self {
            team,
            match_key: Some(match_key.into()),
            position: None,
        }
    }

    pub fn is_match(&self) -> bool {
        self.match_key.is_some()
    }

    /// The team-level subject for the same team
    pub fn to_team(&self) -> Self {
        Self::team(self.team)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.match_key {
            Some(key) => write!(f, "{} in {}", self.team, key),
            None => write!(f, "{}", self.team),
        }
    }
}

/// One scouting submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub team: TeamNumber,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_key: Option<String>,

    /// Alliance position within the match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u8>,

    #[serde(default)]
    pub mode: ScoutMode,

    #[serde(default)]
    pub unsure: bool,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub unsure_reason: String,

    /// Ignored records stay stored but never feed aggregation
    #[serde(default)]
    pub ignore: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scouter: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,

    #[serde(default)]
    pub fields: BTreeMap<String, RawValue>,

    /// Legacy records carry the event id and match number instead of a key
    #[serde(default, skip_serializing)]
    pub event_id: Option<String>,

    #[serde(default, skip_serializing)]
    pub match_number: Option<u32>,
}

impl ResultRecord {
    /// Subject this record describes
    pub fn subject(&self) -> Subject {
        Subject {
            team: self.team,
            match_key: self.match_key.clone(),
            position: self.position,
        }
    }

    /// Timestamp used to pick the latest record for a subject
    pub fn last_touched(&self) -> Option<DateTime<Utc>> {
        self.modified.or(self.created)
    }
}

/// Input field types supported by scouting configs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[serde(alias = "checkbox")]
    Boolean,
    Counter,
    Select,
    Dropdown,
    Multiselect,
    Multicounter,
    Number,
    String,
    Text,
    Slider,
    /// A cyclic column; its value is the list of cycle entries
    Cycle,
}

impl FieldKind {
    pub fn is_enumerated(self) -> bool {
        matches!(self, FieldKind::Select | FieldKind::Dropdown | FieldKind::Multiselect)
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            FieldKind::Counter | FieldKind::Number | FieldKind::Slider | FieldKind::Multicounter
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::Boolean => "boolean",
            FieldKind::Counter => "counter",
            FieldKind::Select => "select",
            FieldKind::Dropdown => "dropdown",
            FieldKind::Multiselect => "multiselect",
            FieldKind::Multicounter => "multicounter",
            FieldKind::Number => "number",
            FieldKind::String => "string",
            FieldKind::Text => "text",
            FieldKind::Slider => "slider",
            FieldKind::Cycle => "cycle",
        }
    }
}

/// "Lower is better" polarity of a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Negative {
    Scalar(bool),
    PerOption(Vec<bool>),
}

impl Default for Negative {
    fn default() -> Self {
        Negative::Scalar(false)
    }
}

impl Negative {
    /// Polarity of the whole field, or of one option
    pub fn is_negative(&self, option: Option<usize>) -> bool {
        match (self, option) {
            (Negative::Scalar(neg), _) => *neg,
            (Negative::PerOption(flags), Some(index)) => flags.get(index).copied().unwrap_or(false),
            (Negative::PerOption(_), None) => false,
        }
    }
}

/// An input defined by the scouting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub id: String,
    pub name: String,

    #[serde(rename = "type")]
    pub kind: FieldKind,

    #[serde(default)]
    pub mode: ScoutMode,

    #[serde(default)]
    pub options: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,

    #[serde(default)]
    pub negative: Negative,

    /// Id of the cyclic column this input repeats inside
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle: Option<String>,
}

/// Identity attributes of an event team
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamInfo {
    pub number: TeamNumber,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub city: String,

    #[serde(default)]
    pub state_prov: String,

    #[serde(default)]
    pub country: String,
}

/// Everything loaded from the configuration source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventConfig {
    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub fields: Vec<FieldDefinition>,

    #[serde(default)]
    pub smart_stats: Vec<SmartStatDefinition>,

    /// Smart stat entries that could not be decoded
    #[serde(skip)]
    pub rejected_stats: Vec<InvalidDefinitionError>,

    #[serde(default)]
    pub teams: Vec<TeamInfo>,
}

/// Display metadata for an imported official-results key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FmsFieldInfo {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub negative: bool,
}

/// Values imported from official results, treated as opaque leaves
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FmsImport {
    #[serde(default)]
    pub fields: BTreeMap<String, FmsFieldInfo>,

    /// Team-level values (rankings, records)
    #[serde(default)]
    pub teams: BTreeMap<TeamNumber, BTreeMap<String, RawValue>>,

    /// Match-team values: match key -> team -> values
    #[serde(default)]
    pub matches: BTreeMap<String, BTreeMap<TeamNumber, BTreeMap<String, RawValue>>>,
}

impl FmsImport {
    /// Every key id present in the import, in sorted order
    pub fn key_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.fields.keys().cloned().collect();
        let leaves = self
            .teams
            .values()
            .chain(self.matches.values().flat_map(|teams| teams.values()));
        for values in leaves {
            ids.extend(values.keys().cloned());
        }
        ids.sort();
        ids.dedup();
        ids
    }

    /// First value seen for a key, used to infer its kind
    pub fn sample(&self, id: &str) -> Option<&RawValue> {
        self.teams
            .values()
            .chain(self.matches.values().flat_map(|teams| teams.values()))
            .find_map(|values| values.get(id))
    }
}

/// Sort key for a match key such as `2024cc_qm12` or `2024cc_sf2m1`
///
/// Orders by competition level, then set number, then match number.
/// Unrecognised keys sort after every known level.
pub fn match_order(match_key: &str) -> (usize, u32, u32, String) {
    let tail = match_key.rsplit('_').next().unwrap_or(match_key);
    let level_end = tail.find(|c: char| c.is_ascii_digit()).unwrap_or(tail.len());
    let level = &tail[..level_end];
    let rest = &tail[level_end..];

    let Some(level_rank) = MATCH_LEVELS.iter().position(|l| *l == level) else {
        return (MATCH_LEVELS.len(), 0, 0, match_key.to_string());
    };

    let (set, number) = match rest.split_once('m') {
        Some((set, number)) => (set.parse().unwrap_or(0), number.parse().unwrap_or(0)),
        None => (0, rest.parse().unwrap_or(0)),
    };

    (level_rank, set, number, match_key.to_string())
}
