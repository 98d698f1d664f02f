//! Storage of raw scouting records.
//!
//! The store keeps every record, ignored or not. Reads used for
//! aggregation go through a [`Snapshot`](super::Snapshot) instead.

use crate::parser::schema::{ResultRecord, ScoutMode, TeamNumber};
use crate::utils::error::StoreError;
use log::debug;

/// Index of a record inside the store
pub type RecordId = usize;

/// Holds raw result records, partitioned by scouting mode on read
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<ResultRecord>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<ResultRecord>) -> Self {
        Self { records }
    }

    /// Add a record, returning its id
    pub fn insert(&mut self, record: ResultRecord) -> RecordId {
        self.records.push(record);
        self.records.len() - 1
    }

    pub fn get(&self, id: RecordId) -> Option<&ResultRecord> {
        self.records.get(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records with their ids, in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (RecordId, &ResultRecord)> {
        self.records.iter().enumerate()
    }

    /// Records of one scouting mode
    pub fn by_mode(&self, mode: ScoutMode) -> impl Iterator<Item = (RecordId, &ResultRecord)> {
        self.iter().filter(move |(_, r)| r.mode == mode)
    }

    /// Ids of every record (ignored included) for a subject
    pub fn find(
        &self,
        mode: ScoutMode,
        team: TeamNumber,
        match_key: Option<&str>,
    ) -> Vec<RecordId> {
        self.by_mode(mode)
            .filter(|(_, r)| r.team == team && r.match_key.as_deref() == match_key)
            .map(|(id, _)| id)
            .collect()
    }

    /// Exclude or re-include a record in aggregation
    ///
    /// Takes effect on the next snapshot rebuild.
    pub fn set_ignore(&mut self, id: RecordId, ignore: bool) -> Result<(), StoreError> {
        let record = self
            .records
            .get_mut(id)
            .ok_or(StoreError::UnknownRecord(id))?;
        debug!("Record {} ignore: {} -> {}", id, record.ignore, ignore);
        record.ignore = ignore;
        Ok(())
    }

    /// Flag a record as unsure, with a reason, or clear the flag
    pub fn set_unsure(
        &mut self,
        id: RecordId,
        unsure: bool,
        reason: impl Into<String>,
    ) -> Result<(), StoreError> {
        let record = self
            .records
            .get_mut(id)
            .ok_or(StoreError::UnknownRecord(id))?;
        record.unsure = unsure;
        record.unsure_reason = if unsure { reason.into() } else { String::new() };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_record;
    use serde_json::json;

    fn store() -> RecordStore {
        let records = vec![
            parse_record(&json!({"team": 1, "match_key": "e_qm1"})).unwrap(),
            parse_record(&json!({"team": 1, "match_key": "e_qm1", "ignore": true})).unwrap(),
            parse_record(&json!({"team": 1, "mode": "pit"})).unwrap(),
        ];
        RecordStore::from_records(records)
    }

    #[test]
    fn test_find_includes_ignored() {
        let store = store();
        assert_eq!(store.find(ScoutMode::Match, 1, Some("e_qm1")), vec![0, 1]);
        assert_eq!(store.find(ScoutMode::Pit, 1, None), vec![2]);
    }

    #[test]
    fn test_toggle_flags() {
        let mut store = store();
        store.set_ignore(1, false).unwrap();
        assert!(!store.get(1).unwrap().ignore);

        store.set_unsure(0, true, "blocked view").unwrap();
        assert_eq!(store.get(0).unwrap().unsure_reason, "blocked view");

        assert_eq!(store.set_ignore(9, true), Err(StoreError::UnknownRecord(9)));
    }
}
