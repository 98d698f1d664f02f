//! Input parsing and schema definitions.
//!
//! This module handles:
//! - Parsing raw scouting records from JSON
//! - Upgrading legacy record shapes
//! - Parsing field/smart-stat configuration and official results

pub mod records;
pub mod schema;

// Re-export main types
pub use records::{parse_config, parse_fms, parse_record, parse_records};
pub use schema::{
    match_order, CycleEntry, EventConfig, FieldDefinition, FieldKind, FmsFieldInfo, FmsImport,
    Negative, RawValue, ResultRecord, ScoutMode, Subject, TeamInfo, TeamNumber,
};
