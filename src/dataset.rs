//! The dataset: records, configuration and the current snapshot.
//!
//! A [`Dataset`] is an explicit handle passed to every reader. Reads go
//! through an immutable [`Snapshot`] held in an `Arc`; rebuilding swaps in
//! a fresh snapshot, so a reader holding the old one never sees a partial
//! update.

use crate::aggregator::{aggregate, aggregate_option, Aggregate, AggregateFn, Value};
use crate::keys::{KeyResolver, NamespacedKey};
use crate::parser::schema::{EventConfig, FmsImport, ResultRecord, Subject, TeamNumber};
use crate::smart::{compile_definitions, Evaluation, SmartStatEngine};
use crate::store::{RecordId, RecordStore, Snapshot};
use crate::utils::config::EngineSettings;
use crate::utils::error::{InvalidDefinitionError, StatError, StoreError};
use log::{debug, info, warn};
use std::sync::Arc;

#[derive(Debug)]
pub struct Dataset {
    store: RecordStore,
    config: EventConfig,
    settings: EngineSettings,
    resolver: KeyResolver,
    engine: SmartStatEngine,
    definition_errors: Vec<InvalidDefinitionError>,
    snapshot: Arc<Snapshot>,
}

impl Dataset {
    /// Build a dataset and its first snapshot
    ///
    /// Smart stat definitions are validated here. Invalid ones are
    /// reported through [`Dataset::definition_errors`] and left out of the
    /// working set; they never abort construction.
    pub fn new(
        records: Vec<ResultRecord>,
        config: EventConfig,
        fms: FmsImport,
        settings: EngineSettings,
    ) -> Self {
        let mut resolver = KeyResolver::new(&config.fields, fms);
        let report = compile_definitions(&config.smart_stats, &mut resolver);
        let store = RecordStore::from_records(records);
        let snapshot = Arc::new(Snapshot::build(&store, &config.teams));

        info!(
            "Loaded {} records, {} fields, {} of {} smart stats",
            store.len(),
            config.fields.len(),
            report.compiled.len(),
            config.smart_stats.len()
        );

        Self {
            store,
            settings,
            resolver,
            engine: SmartStatEngine::new(report.compiled),
            definition_errors: config
                .rejected_stats
                .iter()
                .cloned()
                .chain(report.errors)
                .collect(),
            snapshot,
            config,
        }
    }

    /// Replace the snapshot with one built from the current records
    ///
    /// Flag changes and new records are invisible until this is called.
    pub fn rebuild(&mut self) {
        self.snapshot = Arc::new(Snapshot::build(&self.store, &self.config.teams));
        debug!("Snapshot rebuilt with {} records", self.snapshot.len());
    }

    /// Current snapshot; stays valid across later rebuilds
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn insert_record(&mut self, record: ResultRecord) -> RecordId {
        self.store.insert(record)
    }

    pub fn set_ignore(&mut self, id: RecordId, ignore: bool) -> Result<(), StoreError> {
        self.store.set_ignore(id, ignore)
    }

    pub fn set_unsure(
        &mut self,
        id: RecordId,
        unsure: bool,
        reason: impl Into<String>,
    ) -> Result<(), StoreError> {
        self.store.set_unsure(id, unsure, reason)
    }

    pub fn config(&self) -> &EventConfig {
        &self.config
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn resolver(&self) -> &KeyResolver {
        &self.resolver
    }

    pub fn engine(&self) -> &SmartStatEngine {
        &self.engine
    }

    /// Smart stats excluded at load time
    pub fn definition_errors(&self) -> &[InvalidDefinitionError] {
        &self.definition_errors
    }

    /// Every team in the current snapshot, ascending
    pub fn teams(&self) -> Vec<TeamNumber> {
        self.snapshot.teams().to_vec()
    }

    /// Parse a key string against this dataset's definitions
    pub fn parse_key(&self, key: &str) -> Result<NamespacedKey, StatError> {
        self.resolver.parse(key)
    }

    /// Aggregation used for a key when the caller names none
    pub fn default_function(&self, key: &NamespacedKey) -> AggregateFn {
        self.engine
            .get(key)
            .and_then(|stat| stat.definition.function)
            .unwrap_or(self.settings.default_function)
    }

    /// Whether lower values of a key are better
    pub fn is_negative(&self, key: &NamespacedKey) -> Result<bool, StatError> {
        Ok(self.resolver.resolve(key)?.is_negative(key.option))
    }

    /// Raw value of a key for a subject
    ///
    /// **Public** - unaggregated read, smart stats included
    ///
    /// # Returns
    /// A single value, a `Value::List` of per-match values for team
    /// subjects, or `Value::Missing`
    pub fn get_value(
        &self,
        key: &NamespacedKey,
        subject: &Subject,
        cycle_index: Option<usize>,
    ) -> Result<Value, StatError> {
        let mut evaluation = self.evaluation();
        self.resolver
            .read(&self.snapshot, &mut evaluation, key, subject, cycle_index)
    }

    /// Aggregated value of a key
    ///
    /// **Public** - main entry point for stat reads
    ///
    /// # Arguments
    /// * `key` - Key to compute
    /// * `subject` - Team or match-team; `None` pools every team's
    ///   observations into one event-wide value
    /// * `func` - Aggregation; defaults to the stat's own, then the
    ///   configured default
    ///
    /// # Errors
    /// * `StatError::UnknownKey` - The key does not resolve
    ///
    /// Any other failure degrades the affected subject to no data.
    pub fn compute_stat(
        &self,
        key: &NamespacedKey,
        subject: Option<&Subject>,
        func: Option<AggregateFn>,
    ) -> Result<Aggregate, StatError> {
        self.resolver.resolve(key)?;
        let func = func.unwrap_or_else(|| self.default_function(key));
        let mut evaluation = self.evaluation();

        let values = match subject {
            Some(subject) => vec![self.read_or_missing(&mut evaluation, key, subject)?],
            None => {
                let mut pooled = Vec::new();
                for team in self.snapshot.teams() {
                    pooled.push(self.read_or_missing(&mut evaluation, key, &Subject::team(*team))?);
                }
                pooled
            }
        };
        self.aggregate_values(key, &values, func)
    }

    /// Aggregated value of a key for each of several teams
    ///
    /// One evaluation serves every team, so smart stats that look across
    /// the event (weighted ranks) compute each team's inputs once.
    ///
    /// # Errors
    /// * `StatError::UnknownKey` - The key does not resolve
    pub fn compute_team_stats(
        &self,
        key: &NamespacedKey,
        teams: &[TeamNumber],
        func: Option<AggregateFn>,
    ) -> Result<Vec<Aggregate>, StatError> {
        self.resolver.resolve(key)?;
        let func = func.unwrap_or_else(|| self.default_function(key));
        let mut evaluation = self.evaluation();

        teams
            .iter()
            .map(|team| {
                let value = self.read_or_missing(&mut evaluation, key, &Subject::team(*team))?;
                self.aggregate_values(key, &[value], func)
            })
            .collect()
    }

    fn evaluation(&self) -> Evaluation<'_> {
        self.engine
            .evaluation(&self.snapshot, &self.resolver, self.settings.default_function)
    }

    fn aggregate_values(
        &self,
        key: &NamespacedKey,
        values: &[Value],
        func: AggregateFn,
    ) -> Result<Aggregate, StatError> {
        let meta = self.resolver.resolve(key)?;
        Ok(match key.option {
            Some(option) => aggregate_option(values, func, option),
            None => aggregate(values, func, meta.value_kind()),
        })
    }

    /// Read a value, degrading subject-local failures to missing
    fn read_or_missing(
        &self,
        evaluation: &mut Evaluation<'_>,
        key: &NamespacedKey,
        subject: &Subject,
    ) -> Result<Value, StatError> {
        match self
            .resolver
            .read(&self.snapshot, evaluation, key, subject, None)
        {
            Err(e) if e.is_subject_local() => {
                warn!("No data for {} at {}: {}", key, subject, e);
                Ok(Value::Missing)
            }
            other => other,
        }
    }

    /// Friendly name of a key, prefixed with the aggregation if given
    pub fn display_name(&self, key: &NamespacedKey, func: Option<AggregateFn>) -> String {
        self.resolver.display_name(key, func)
    }

    /// Render an aggregate of a key for display
    pub fn display(&self, key: &NamespacedKey, value: &Aggregate) -> String {
        let options = match (key.option, self.resolver.resolve(key)) {
            (None, Ok(meta)) => meta.options.as_slice(),
            _ => &[],
        };
        value.display(options, self.settings.display_decimals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_record;
    use serde_json::json;

    fn dataset() -> Dataset {
        let config: EventConfig = serde_json::from_value(json!({
            "fields": [
                {"id": "x", "name": "X", "type": "number"},
                {"id": "climb", "name": "Climb", "type": "select", "options": ["None", "Park", "Hang"]}
            ],
            "smart_stats": [
                {"id": "double", "type": "math", "math": "x * 2", "function": "max"},
                {"id": "broken", "type": "math", "math": "y * 2"}
            ],
            "teams": [{"number": 1}, {"number": 2}, {"number": 3}]
        }))
        .unwrap();
        let records = [
            json!({"team": 1, "match_key": "e_qm1", "fields": {"x": 10, "climb": 2}}),
            json!({"team": 1, "match_key": "e_qm2", "fields": {"x": 20, "climb": 2}}),
            json!({"team": 2, "match_key": "e_qm1", "fields": {"x": 30, "climb": 1}}),
        ]
        .iter()
        .map(|r| parse_record(r).unwrap())
        .collect();
        Dataset::new(records, config, FmsImport::default(), EngineSettings::default())
    }

    #[test]
    fn test_invalid_definitions_reported_not_fatal() {
        let data = dataset();
        assert_eq!(data.definition_errors().len(), 1);
        assert_eq!(data.definition_errors()[0].id, "broken");
        assert!(matches!(data.parse_key("smart.broken"), Err(StatError::UnknownKey(_))));
    }

    #[test]
    fn test_smart_default_function() {
        let data = dataset();
        let key = data.parse_key("smart.double").unwrap();
        assert_eq!(data.default_function(&key), AggregateFn::Max);
        assert_eq!(
            data.compute_stat(&key, Some(&Subject::team(1)), None).unwrap(),
            Aggregate::Number(40.0)
        );
    }

    #[test]
    fn test_option_key_and_display() {
        let data = dataset();
        let hang = data.parse_key("result.climb.2").unwrap();
        let rate = data.compute_stat(&hang, None, Some(AggregateFn::Mean)).unwrap();
        assert_eq!(data.display(&hang, &rate), "0.67");

        let climb = data.parse_key("result.climb").unwrap();
        let mode = data.compute_stat(&climb, Some(&Subject::team(1)), Some(AggregateFn::Mode)).unwrap();
        assert_eq!(data.display(&climb, &mode), "Hang");

        let none = data.compute_stat(&climb, Some(&Subject::team(3)), None).unwrap();
        assert_eq!(data.display(&climb, &none), "---");
    }

    #[test]
    fn test_old_snapshot_survives_rebuild() {
        let mut data = dataset();
        let before = data.snapshot();
        data.set_ignore(0, true).unwrap();
        data.rebuild();
        assert_eq!(before.len(), 3);
        assert_eq!(data.snapshot().len(), 2);
    }
}
