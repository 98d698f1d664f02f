use pretty_assertions::assert_eq;
use scout_stats::aggregator::{Aggregate, AggregateFn};
use scout_stats::output::{read_picklists, write_picklists};
use scout_stats::parser::{parse_config, parse_record, FmsImport};
use scout_stats::ranking::{Picklists, RankingEngine};
use scout_stats::utils::config::EngineSettings;
use scout_stats::Dataset;
use serde_json::json;

fn dataset(negative: bool) -> Dataset {
    let config = parse_config(&json!({
        "fields": [
            {"id": "cycle_time", "name": "Cycle Time", "type": "number", "negative": negative},
            {"id": "notes", "name": "Notes", "type": "text"}
        ],
        "teams": [{"number": 1}, {"number": 2}, {"number": 3}, {"number": 4}, {"number": 5}]
    }))
    .unwrap();
    let records = [
        json!({"team": 1, "match_key": "e_qm1", "fields": {"cycle_time": 12, "notes": "fast"}}),
        json!({"team": 2, "match_key": "e_qm1", "fields": {"cycle_time": 8}}),
        json!({"team": 3, "match_key": "e_qm1", "fields": {"cycle_time": 12}}),
        json!({"team": 4, "match_key": "e_qm1", "fields": {"cycle_time": 20}}),
    ]
    .iter()
    .map(|r| parse_record(r).unwrap())
    .collect();
    Dataset::new(records, config, FmsImport::default(), EngineSettings::default())
}

#[test]
fn test_rank_descending_stable() {
    let data = dataset(false);
    let key = data.parse_key("result.cycle_time").unwrap();
    // 1 and 3 tie; input order kept; 5 has no data
    assert_eq!(
        RankingEngine::new(&data).rank(&key, &[1, 2, 3, 4, 5]).unwrap(),
        vec![4, 1, 3, 2, 5]
    );
}

#[test]
fn test_negative_reverses_valued_teams() {
    let data = dataset(true);
    let key = data.parse_key("result.cycle_time").unwrap();
    assert_eq!(
        RankingEngine::new(&data).rank(&key, &[1, 2, 3, 4, 5]).unwrap(),
        vec![2, 3, 1, 4, 5]
    );
}

#[test]
fn test_rank_is_idempotent() {
    let data = dataset(false);
    let key = data.parse_key("result.cycle_time").unwrap();
    let engine = RankingEngine::new(&data);
    let teams = [5, 4, 3, 2, 1];
    assert_eq!(engine.rank(&key, &teams).unwrap(), engine.rank(&key, &teams).unwrap());
}

#[test]
fn test_output_keeps_every_team() {
    let data = dataset(false);
    let key = data.parse_key("result.notes").unwrap();
    let ranking = RankingEngine::new(&data)
        .ranking(&key, &[3, 1, 2], Some(AggregateFn::Mode))
        .unwrap();

    assert_eq!(ranking.order(), vec![1, 2, 3]);
    assert_eq!(ranking.ranked_count(), 0);
    assert_eq!(ranking.entries[0].value, Aggregate::Text("fast".to_string()));
}

#[test]
fn test_ranking_values_and_function() {
    let data = dataset(false);
    let key = data.parse_key("result.cycle_time").unwrap();
    let ranking = RankingEngine::new(&data).ranking(&key, &[2, 4], None).unwrap();

    assert_eq!(ranking.function, AggregateFn::Mean);
    assert!(!ranking.negative);
    assert_eq!(ranking.entries[0].value, Aggregate::Number(20.0));
    assert_eq!(ranking.to_picklist(), vec!["4".to_string(), "2".to_string()]);
}

#[test]
fn test_picklist_saved_from_ranking() {
    let data = dataset(false);
    let key = data.parse_key("result.cycle_time").unwrap();
    let ranking = RankingEngine::new(&data).ranking(&key, &data.teams(), None).unwrap();

    let mut lists = Picklists::new();
    lists.replace("speed", ranking.to_picklist());
    lists.cross_out("4");

    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("picklists.json");
    write_picklists(&lists, &path).unwrap();

    let loaded = read_picklists(&path).unwrap();
    assert_eq!(loaded, lists);
    assert_eq!(loaded.get("speed").unwrap()[0], "4");
    assert!(loaded.is_picked("4"));
}

#[test]
fn test_no_data_tail_in_team_order() {
    let config = parse_config(&json!({
        "fields": [{"id": "x", "name": "X", "type": "number"}],
        "teams": [{"number": 1}, {"number": 2}, {"number": 3}]
    }))
    .unwrap();
    let records = vec![parse_record(&json!({"team": 2, "match_key": "e_qm1", "fields": {"x": 5}})).unwrap()];
    let data = Dataset::new(records, config, FmsImport::default(), EngineSettings::default());
    let key = data.parse_key("result.x").unwrap();

    assert_eq!(RankingEngine::new(&data).rank(&key, &[3, 1, 2]).unwrap(), vec![2, 1, 3]);
}
