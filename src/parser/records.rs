//! Lenient parsers for raw record, config and official-results JSON.
//!
//! Records are parsed one at a time so a single malformed submission
//! never prevents the rest of the event from loading.

use super::schema::{EventConfig, FmsImport, ResultRecord, ScoutMode};
use crate::utils::config::LEGACY_MATCH_LEVEL;
use crate::utils::error::{InvalidDefinitionError, ParseError};
use log::{debug, warn};

/// Field names that may hold the record array when wrapped in an object
const RECORD_FIELD_NAMES: &[&str] = &["records", "results"];

/// Parse raw result records
///
/// **Public** - main entry point for record parsing
///
/// Accepts a bare array or an object wrapping the array under
/// `records`/`results`. Records that fail to decode or violate their
/// subject invariant are logged and skipped.
///
/// # Errors
/// * `ParseError::InvalidFormat` - Input is not an array, or every record failed
pub fn parse_records(raw: &serde_json::Value) -> Result<Vec<ResultRecord>, ParseError> {
    let entries = match raw {
        serde_json::Value::Array(entries) => entries,
        serde_json::Value::Object(obj) => RECORD_FIELD_NAMES
            .iter()
            .find_map(|field| obj.get(*field).and_then(|v| v.as_array()))
            .ok_or_else(|| {
                ParseError::InvalidFormat("No record array found in object".to_string())
            })?,
        _ => {
            return Err(ParseError::InvalidFormat(
                "Records must be a JSON array or object".to_string(),
            ))
        }
    };

    let mut records = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        match parse_record(entry) {
            Ok(record) => records.push(record),
            Err(e) => warn!("Skipping record {}: {}", index, e),
        }
    }

    if records.is_empty() && !entries.is_empty() {
        return Err(ParseError::InvalidFormat(
            "All records failed to parse".to_string(),
        ));
    }

    debug!("Parsed {} of {} records", records.len(), entries.len());
    Ok(records)
}

/// Parse and normalize a single record
///
/// **Public** - also used when records arrive one at a time
pub fn parse_record(raw: &serde_json::Value) -> Result<ResultRecord, ParseError> {
    let mut record: ResultRecord = serde_json::from_value(raw.clone())?;
    upgrade_legacy_key(&mut record);
    check_subject(&record)?;
    Ok(record)
}

/// Give legacy records a match key built from event id and match number
fn upgrade_legacy_key(record: &mut ResultRecord) {
    if record.match_key.is_some() || record.mode != ScoutMode::Match {
        return;
    }
    if let (Some(event), Some(number)) = (&record.event_id, record.match_number) {
        record.match_key = Some(format!("{}_{}{}", event, LEGACY_MATCH_LEVEL, number));
    }
}

/// Enforce exactly one subject per record
fn check_subject(record: &ResultRecord) -> Result<(), ParseError> {
    match (record.mode, &record.match_key) {
        (ScoutMode::Match, None) => Err(ParseError::InvalidFormat(format!(
            "match record for team {} has no match key",
            record.team
        ))),
        (ScoutMode::Pit, Some(key)) => Err(ParseError::InvalidFormat(format!(
            "pit record for team {} names match {}",
            record.team, key
        ))),
        _ => Ok(()),
    }
}

/// Parse the field / smart stat / team configuration
///
/// Smart stats are decoded one at a time; a malformed entry is kept in
/// `EventConfig::rejected_stats` instead of failing the whole config.
pub fn parse_config(raw: &serde_json::Value) -> Result<EventConfig, ParseError> {
    let mut raw = raw.clone();
    let stats = raw
        .as_object_mut()
        .and_then(|object| object.remove("smart_stats"))
        .unwrap_or_default();

    let mut config: EventConfig = serde_json::from_value(raw)?;
    let entries = match stats {
        serde_json::Value::Array(entries) => entries,
        serde_json::Value::Null => Vec::new(),
        _ => {
            return Err(ParseError::InvalidFormat(
                "smart_stats must be an array".to_string(),
            ))
        }
    };
    for entry in entries {
        let id = entry
            .get("id")
            .and_then(|id| id.as_str())
            .unwrap_or("<no id>")
            .to_string();
        match serde_json::from_value(entry) {
            Ok(definition) => config.smart_stats.push(definition),
            Err(e) => {
                warn!("Rejecting smart stat '{}': {}", id, e);
                config
                    .rejected_stats
                    .push(InvalidDefinitionError::new(id, e.to_string()));
            }
        }
    }

    debug!(
        "Parsed config: {} fields, {} smart stats, {} teams",
        config.fields.len(),
        config.smart_stats.len(),
        config.teams.len()
    );
    Ok(config)
}

/// Parse imported official results
pub fn parse_fms(raw: &serde_json::Value) -> Result<FmsImport, ParseError> {
    let fms: FmsImport = serde_json::from_value(raw.clone())?;
    debug!(
        "Parsed official results: {} teams, {} matches",
        fms.teams.len(),
        fms.matches.len()
    );
    Ok(fms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_records_skips_bad_entries() {
        let raw = json!([
            {"team": 254, "match_key": "2024cc_qm1", "fields": {"auto": 3}},
            {"team": "not a number"},
            {"team": 1678, "mode": "pit", "fields": {"drive": 1}}
        ]);

        let records = parse_records(&raw).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].mode, ScoutMode::Pit);
    }

    #[test]
    fn test_parse_config_keeps_malformed_stats_aside() {
        let raw = json!({
            "fields": [{"id": "auto", "name": "Auto", "type": "counter"}],
            "smart_stats": [
                {"id": "double", "type": "math", "math": "auto * 2"},
                {"id": "odd", "type": "sorcery"}
            ]
        });
        let config = parse_config(&raw).unwrap();
        assert_eq!(config.smart_stats.len(), 1);
        assert_eq!(config.rejected_stats.len(), 1);
        assert_eq!(config.rejected_stats[0].id, "odd");
    }

    #[test]
    fn test_parse_records_all_invalid() {
        let raw = json!([{"team": "x"}, {"mode": "match"}]);
        assert!(parse_records(&raw).is_err());
    }

    #[test]
    fn test_parse_records_wrapped_object() {
        let raw = json!({"results": [{"team": 1, "match_key": "e_qm1"}]});
        assert_eq!(parse_records(&raw).unwrap().len(), 1);
    }

    #[test]
    fn test_legacy_match_key() {
        let raw = json!({"team": 1, "event_id": "2022wila", "match_number": 7});
        let record = parse_record(&raw).unwrap();
        assert_eq!(record.match_key.as_deref(), Some("2022wila_qm7"));
    }

    #[test]
    fn test_match_record_without_key_rejected() {
        let raw = json!({"team": 1, "fields": {}});
        assert!(matches!(
            parse_record(&raw),
            Err(ParseError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_pit_record_with_match_key_rejected() {
        let raw = json!({"team": 1, "mode": "pit", "match_key": "e_qm1"});
        assert!(parse_record(&raw).is_err());
    }
}
