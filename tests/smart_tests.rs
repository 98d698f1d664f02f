use pretty_assertions::assert_eq;
use scout_stats::aggregator::{Aggregate, AggregateFn};
use scout_stats::parser::{parse_config, parse_record, FmsImport, Subject};
use scout_stats::ranking::RankingEngine;
use scout_stats::utils::config::EngineSettings;
use scout_stats::Dataset;
use serde_json::{json, Value};

fn dataset(stats: Value, records: &[Value]) -> Dataset {
    let config = parse_config(&json!({
        "fields": [
            {"id": "a", "name": "A", "type": "number"},
            {"id": "b", "name": "B", "type": "number"}
        ],
        "smart_stats": stats,
        "teams": [{"number": 1}, {"number": 2}]
    }))
    .unwrap();
    let records = records.iter().map(|r| parse_record(r).unwrap()).collect();
    Dataset::new(records, config, FmsImport::default(), EngineSettings::default())
}

fn number(data: &Dataset, key: &str, subject: &Subject) -> Aggregate {
    let key = data.parse_key(key).unwrap();
    data.compute_stat(&key, Some(subject), Some(AggregateFn::Mean)).unwrap()
}

#[test]
fn test_math_percentage() {
    let data = dataset(
        json!([{"id": "rate", "type": "math", "math": "a / b * 100"}]),
        &[json!({"team": 1, "match_key": "e_qm1", "fields": {"a": 50, "b": 200}})],
    );
    assert_eq!(number(&data, "smart.rate", &Subject::team(1)), Aggregate::Number(25.0));
    assert_eq!(
        number(&data, "smart.rate", &Subject::match_team(1, "e_qm1")),
        Aggregate::Number(25.0)
    );
}

#[test]
fn test_math_missing_operand_is_no_data() {
    let data = dataset(
        json!([{"id": "rate", "type": "math", "math": "a / b * 100"}]),
        &[
            json!({"team": 1, "match_key": "e_qm1", "fields": {"a": 50}}),
            json!({"team": 2, "match_key": "e_qm1", "fields": {"a": 50, "b": 0}}),
        ],
    );
    assert_eq!(number(&data, "smart.rate", &Subject::team(1)), Aggregate::NoData);
    assert_eq!(number(&data, "smart.rate", &Subject::team(2)), Aggregate::NoData);
}

#[test]
fn test_cycle_reports_both_and_excludes_them() {
    let data = dataset(
        json!([
            {"id": "x", "type": "math", "math": "smart.y + 1"},
            {"id": "y", "type": "math", "math": "smart.x + 1"},
            {"id": "ok", "type": "math", "math": "a + 1"}
        ]),
        &[],
    );

    let mut ids: Vec<&str> = data.definition_errors().iter().map(|e| e.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["x", "y"]);
    assert!(data.parse_key("smart.x").is_err());
    assert!(data.parse_key("smart.y").is_err());
    assert!(data.parse_key("smart.ok").is_ok());
}

#[test]
fn test_dependent_on_invalid_is_invalid() {
    let data = dataset(
        json!([
            {"id": "bad", "type": "math", "math": "missing_field * 2"},
            {"id": "uses_bad", "type": "math", "math": "bad + a"}
        ]),
        &[],
    );
    assert_eq!(data.definition_errors().len(), 2);
}

#[test]
fn test_chained_smart_stats() {
    let data = dataset(
        json!([
            {"id": "total", "type": "sum", "keys": ["a", "b"]},
            {"id": "double_total", "type": "math", "math": "total * 2"}
        ]),
        &[
            json!({"team": 1, "match_key": "e_qm1", "fields": {"a": 1, "b": 2}}),
            json!({"team": 1, "match_key": "e_qm2", "fields": {"a": 3, "b": 4}}),
        ],
    );
    // per match: 6 and 14
    assert_eq!(number(&data, "smart.double_total", &Subject::team(1)), Aggregate::Number(10.0));
}

#[test]
fn test_team_scope_differs_from_per_match() {
    let stats = |team_scoped: bool| {
        json!([{"id": "r", "type": "ratio", "numerator": "a", "denominator": "b", "is_team_smart_result": team_scoped}])
    };
    let records = [
        json!({"team": 1, "match_key": "e_qm1", "fields": {"a": 1, "b": 1}}),
        json!({"team": 1, "match_key": "e_qm2", "fields": {"a": 3, "b": 9}}),
    ];

    // mean of 1 and 1/3
    let per_match = dataset(stats(false), &records);
    match number(&per_match, "smart.r", &Subject::team(1)) {
        Aggregate::Number(n) => assert!((n - 2.0 / 3.0).abs() < 1e-9),
        other => panic!("expected a number, got {:?}", other),
    }

    // 4 / 10
    let team = dataset(stats(true), &records);
    assert_eq!(number(&team, "smart.r", &Subject::team(1)), Aggregate::Number(0.4));
}

#[test]
fn test_rank_by_smart_stat() {
    let data = dataset(
        json!([{"id": "net", "type": "math", "math": "a - b"}]),
        &[
            json!({"team": 1, "match_key": "e_qm1", "fields": {"a": 5, "b": 1}}),
            json!({"team": 2, "match_key": "e_qm1", "fields": {"a": 9, "b": 1}}),
        ],
    );
    let key = data.parse_key("smart.net").unwrap();
    assert_eq!(RankingEngine::new(&data).rank(&key, &[1, 2]).unwrap(), vec![2, 1]);
}
