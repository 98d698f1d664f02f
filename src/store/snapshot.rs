//! Immutable read view over the record store.
//!
//! A snapshot copies the non-ignored records and indexes the latest
//! record per subject. It is rebuilt wholesale whenever records change;
//! there is no incremental update path.

use super::record_store::RecordStore;
use crate::parser::schema::{match_order, ResultRecord, ScoutMode, Subject, TeamInfo, TeamNumber};
use log::debug;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    records: Vec<ResultRecord>,
    latest_match: BTreeMap<(TeamNumber, String), usize>,
    latest_pit: BTreeMap<TeamNumber, usize>,
    team_matches: BTreeMap<TeamNumber, Vec<String>>,
    teams: Vec<TeamNumber>,
    team_info: BTreeMap<TeamNumber, TeamInfo>,
}

impl Snapshot {
    /// Build a snapshot from the store's current non-ignored records
    ///
    /// # Arguments
    /// * `store` - Record store to read
    /// * `teams` - Event team list; teams that only appear in records are added
    pub fn build(store: &RecordStore, teams: &[TeamInfo]) -> Self {
        let mut snapshot = Snapshot {
            team_info: teams.iter().map(|t| (t.number, t.clone())).collect(),
            ..Default::default()
        };

        for (_, record) in store.iter().filter(|(_, r)| !r.ignore) {
            let index = snapshot.records.len();
            snapshot.records.push(record.clone());

            let slot = match (record.mode, &record.match_key) {
                (ScoutMode::Match, Some(key)) => snapshot
                    .latest_match
                    .entry((record.team, key.clone()))
                    .or_insert(index),
                (ScoutMode::Pit, _) => snapshot.latest_pit.entry(record.team).or_insert(index),
                (ScoutMode::Match, None) => continue,
            };
            // Later insertion wins timestamp ties
            if record.last_touched() >= snapshot.records[*slot].last_touched() {
                *slot = index;
            }
        }

        for (team, key) in snapshot.latest_match.keys() {
            snapshot
                .team_matches
                .entry(*team)
                .or_default()
                .push(key.clone());
        }
        for keys in snapshot.team_matches.values_mut() {
            keys.sort_by_key(|k| match_order(k));
        }

        let mut all_teams: Vec<TeamNumber> = snapshot
            .team_info
            .keys()
            .chain(snapshot.team_matches.keys())
            .chain(snapshot.latest_pit.keys())
            .copied()
            .collect();
        all_teams.sort_unstable();
        all_teams.dedup();
        snapshot.teams = all_teams;

        debug!(
            "Built snapshot: {} records, {} match results, {} pit results, {} teams",
            snapshot.records.len(),
            snapshot.latest_match.len(),
            snapshot.latest_pit.len(),
            snapshot.teams.len()
        );

        snapshot
    }

    /// Every event team, ascending by number
    pub fn teams(&self) -> &[TeamNumber] {
        &self.teams
    }

    pub fn team_info(&self, team: TeamNumber) -> Option<&TeamInfo> {
        self.team_info.get(&team)
    }

    /// Match keys a team has results for, in play order
    pub fn match_keys(&self, team: TeamNumber) -> &[String] {
        self.team_matches
            .get(&team)
            .map(|keys| keys.as_slice())
            .unwrap_or(&[])
    }

    /// Match-team subjects for a team, in play order
    pub fn match_subjects(&self, team: TeamNumber) -> Vec<Subject> {
        self.match_keys(team)
            .iter()
            .map(|key| {
                let mut subject = Subject::match_team(team, key.clone());
                subject.position = self.match_record(team, key).and_then(|r| r.position);
                subject
            })
            .collect()
    }

    /// Latest non-ignored match record for a team in a match
    pub fn match_record(&self, team: TeamNumber, match_key: &str) -> Option<&ResultRecord> {
        self.latest_match
            .get(&(team, match_key.to_string()))
            .map(|&index| &self.records[index])
    }

    /// Latest non-ignored pit record for a team
    pub fn pit_record(&self, team: TeamNumber) -> Option<&ResultRecord> {
        self.latest_pit.get(&team).map(|&index| &self.records[index])
    }

    /// Latest record of a mode for a subject
    pub fn record_for(&self, subject: &Subject, mode: ScoutMode) -> Option<&ResultRecord> {
        match (mode, &subject.match_key) {
            (ScoutMode::Pit, _) => self.pit_record(subject.team),
            (ScoutMode::Match, Some(key)) => self.match_record(subject.team, key),
            (ScoutMode::Match, None) => None,
        }
    }

    /// Number of non-ignored records in the snapshot
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_record;
    use serde_json::json;

    #[test]
    fn test_latest_record_wins() {
        let store = RecordStore::from_records(vec![
            parse_record(&json!({"team": 1, "match_key": "e_qm1", "modified": "2024-03-01T10:00:00Z", "fields": {"x": 1}})).unwrap(),
            parse_record(&json!({"team": 1, "match_key": "e_qm1", "modified": "2024-03-01T09:00:00Z", "fields": {"x": 2}})).unwrap(),
            parse_record(&json!({"team": 1, "match_key": "e_qm1", "modified": "2024-03-01T10:00:00Z", "fields": {"x": 3}})).unwrap(),
        ]);
        let snapshot = Snapshot::build(&store, &[]);
        let record = snapshot.match_record(1, "e_qm1").unwrap();
        assert_eq!(record.fields["x"], crate::parser::RawValue::Integer(3));
    }

    #[test]
    fn test_ignored_records_excluded() {
        let mut store = RecordStore::from_records(vec![
            parse_record(&json!({"team": 2, "match_key": "e_qm1"})).unwrap(),
        ]);
        store.set_ignore(0, true).unwrap();

        let snapshot = Snapshot::build(&store, &[]);
        assert!(snapshot.match_record(2, "e_qm1").is_none());
        assert!(snapshot.is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_teams_merge_config_and_records() {
        let store = RecordStore::from_records(vec![
            parse_record(&json!({"team": 30, "match_key": "e_qm2"})).unwrap(),
            parse_record(&json!({"team": 30, "match_key": "e_qm10"})).unwrap(),
        ]);
        let info = TeamInfo {
            number: 4,
            ..Default::default()
        };
        let snapshot = Snapshot::build(&store, &[info]);

        assert_eq!(snapshot.teams(), &[4, 30]);
        assert_eq!(snapshot.match_keys(30), &["e_qm2".to_string(), "e_qm10".to_string()]);
        assert!(snapshot.match_keys(4).is_empty());
    }
}
