use pretty_assertions::assert_eq;
use scout_stats::aggregator::{Aggregate, AggregateFn, Value};
use scout_stats::parser::{parse_record, EventConfig, FmsImport, Subject};
use scout_stats::ranking::RankingEngine;
use scout_stats::utils::config::EngineSettings;
use scout_stats::utils::StatError;
use scout_stats::Dataset;
use serde_json::json;

fn event() -> Dataset {
    let config: EventConfig = serde_json::from_value(json!({
        "fields": [
            {"id": "x", "name": "X", "type": "number"},
            {"id": "fouls", "name": "Fouls", "type": "counter", "negative": true}
        ],
        "teams": [
            {"number": 1, "name": "One"},
            {"number": 2, "name": "Two"},
            {"number": 3, "name": "Three"}
        ]
    }))
    .unwrap();

    let records = [
        json!({"team": 1, "match_key": "e_qm1", "fields": {"x": 10, "fouls": 1}}),
        json!({"team": 1, "match_key": "e_qm2", "fields": {"x": 20, "fouls": 3}}),
        json!({"team": 2, "match_key": "e_qm1", "fields": {"x": 30, "fouls": 0}}),
    ]
    .iter()
    .map(|r| parse_record(r).unwrap())
    .collect();

    Dataset::new(records, config, FmsImport::default(), EngineSettings::default())
}

#[test]
fn test_event_wide_and_team_means() {
    let data = event();
    let x = data.parse_key("result.x").unwrap();

    assert_eq!(
        data.compute_stat(&x, None, Some(AggregateFn::Mean)).unwrap(),
        Aggregate::Number(20.0)
    );
    assert_eq!(
        data.compute_stat(&x, Some(&Subject::team(1)), Some(AggregateFn::Mean)).unwrap(),
        Aggregate::Number(15.0)
    );
    assert_eq!(
        data.compute_stat(&x, Some(&Subject::team(3)), None).unwrap(),
        Aggregate::NoData
    );
}

#[test]
fn test_rank_puts_no_data_last() {
    let data = event();
    let x = data.parse_key("result.x").unwrap();
    assert_eq!(RankingEngine::new(&data).rank(&x, &[1, 2, 3]).unwrap(), vec![2, 1, 3]);
}

#[test]
fn test_unknown_key_propagates() {
    let data = event();
    assert!(matches!(data.parse_key("result.nope"), Err(StatError::UnknownKey(_))));
    assert!(matches!(data.parse_key("bogus.x"), Err(StatError::UnknownKey(_))));
}

#[test]
fn test_match_subject_reads_single_value() {
    let data = event();
    let x = data.parse_key("result.x").unwrap();
    assert_eq!(
        data.get_value(&x, &Subject::match_team(1, "e_qm2"), None).unwrap(),
        Value::Number(20.0)
    );
    assert_eq!(
        data.get_value(&x, &Subject::match_team(1, "e_qm9"), None).unwrap(),
        Value::Missing
    );
}

#[test]
fn test_ignore_needs_rebuild() {
    let mut data = event();
    let x = data.parse_key("result.x").unwrap();
    let team1 = Subject::team(1);

    // record 1 is team 1's second match (x = 20)
    data.set_ignore(1, true).unwrap();
    assert_eq!(
        data.compute_stat(&x, Some(&team1), Some(AggregateFn::Mean)).unwrap(),
        Aggregate::Number(15.0)
    );

    data.rebuild();
    assert_eq!(
        data.compute_stat(&x, Some(&team1), Some(AggregateFn::Mean)).unwrap(),
        Aggregate::Number(10.0)
    );

    data.set_ignore(1, false).unwrap();
    data.rebuild();
    assert_eq!(
        data.compute_stat(&x, Some(&team1), Some(AggregateFn::Mean)).unwrap(),
        Aggregate::Number(15.0)
    );
}

#[test]
fn test_inserted_record_visible_after_rebuild() {
    let mut data = event();
    let x = data.parse_key("result.x").unwrap();
    let record = parse_record(&json!({"team": 3, "match_key": "e_qm2", "fields": {"x": 5}})).unwrap();

    data.insert_record(record);
    assert_eq!(data.compute_stat(&x, Some(&Subject::team(3)), None).unwrap(), Aggregate::NoData);

    data.rebuild();
    assert_eq!(
        data.compute_stat(&x, Some(&Subject::team(3)), None).unwrap(),
        Aggregate::Number(5.0)
    );
}

#[test]
fn test_meta_keys() {
    let data = event();
    let name = data.parse_key("meta.name").unwrap();
    assert_eq!(
        data.get_value(&name, &Subject::team(2), None).unwrap(),
        Value::Text("Two".to_string())
    );
}

#[test]
fn test_negative_flag() {
    let data = event();
    let fouls = data.parse_key("result.fouls").unwrap();
    assert!(data.is_negative(&fouls).unwrap());
    assert_eq!(data.display_name(&fouls, Some(AggregateFn::Mean)), "Mean Fouls");
}

#[test]
fn test_out_of_range_option_is_ignored() {
    let config: EventConfig = serde_json::from_value(json!({
        "fields": [{"id": "climb", "name": "Climb", "type": "select", "options": ["None", "Park", "Hang"]}],
        "teams": [{"number": 1}, {"number": 2}]
    }))
    .unwrap();
    let records = [
        json!({"team": 1, "match_key": "e_qm1", "fields": {"climb": 9223372036854775807_i64}}),
        json!({"team": 1, "match_key": "e_qm2", "fields": {"climb": 2}}),
        json!({"team": 2, "match_key": "e_qm1", "fields": {"climb": 4000000000_i64}}),
    ]
    .iter()
    .map(|r| parse_record(r).unwrap())
    .collect();
    let data = Dataset::new(records, config, FmsImport::default(), EngineSettings::default());
    let climb = data.parse_key("result.climb").unwrap();

    assert_eq!(
        data.compute_stat(&climb, Some(&Subject::team(1)), Some(AggregateFn::Total)).unwrap(),
        Aggregate::Counts(vec![0, 0, 1])
    );
    assert_eq!(
        data.compute_stat(&climb, Some(&Subject::team(2)), Some(AggregateFn::Total)).unwrap(),
        Aggregate::NoData
    );
    let hang = data.parse_key("result.climb.2").unwrap();
    assert_eq!(RankingEngine::new(&data).rank(&hang, &[2, 1]).unwrap(), vec![1, 2]);
}

#[test]
fn test_team_stats_match_single_reads() {
    let data = event();
    let x = data.parse_key("result.x").unwrap();
    let batch = data.compute_team_stats(&x, &[3, 1, 2], Some(AggregateFn::Mean)).unwrap();
    let single: Vec<Aggregate> = [3, 1, 2]
        .iter()
        .map(|team| data.compute_stat(&x, Some(&Subject::team(*team)), Some(AggregateFn::Mean)).unwrap())
        .collect();
    assert_eq!(batch, single);
}
