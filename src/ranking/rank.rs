//! Ordering teams by a stat.

use crate::aggregator::{Aggregate, AggregateFn};
use crate::dataset::Dataset;
use crate::keys::NamespacedKey;
use crate::parser::schema::TeamNumber;
use crate::utils::error::StatError;
use log::debug;
use serde::Serialize;
use std::cmp::Ordering;

/// One team's place in a ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedTeam {
    pub team: TeamNumber,
    pub value: Aggregate,
}

/// A computed ranking, best team first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranking {
    #[serde(serialize_with = "serialize_key")]
    pub key: NamespacedKey,
    pub function: AggregateFn,
    pub negative: bool,
    pub entries: Vec<RankedTeam>,
}

fn serialize_key<S: serde::Serializer>(key: &NamespacedKey, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(key)
}

impl Ranking {
    /// Team numbers, best first
    pub fn order(&self) -> Vec<TeamNumber> {
        self.entries.iter().map(|entry| entry.team).collect()
    }

    /// Teams as picklist entries
    pub fn to_picklist(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.team.to_string()).collect()
    }

    /// Teams with a sortable value
    pub fn ranked_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.value.as_f64().is_some())
            .count()
    }
}

/// Ranks teams using a dataset's current snapshot
pub struct RankingEngine<'a> {
    dataset: &'a Dataset,
}

impl<'a> RankingEngine<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        Self { dataset }
    }

    /// Order teams by a stat, best first
    ///
    /// **Public** - picklist-ready ordering
    ///
    /// # Returns
    /// Every input team exactly once; teams without data come last
    pub fn rank(&self, key: &NamespacedKey, teams: &[TeamNumber]) -> Result<Vec<TeamNumber>, StatError> {
        Ok(self.ranking(key, teams, None)?.order())
    }

    /// Compute a ranking with each team's value
    ///
    /// Teams are sorted descending by value with a stable sort, and the
    /// whole valued sequence is reversed when the stat is negative. Teams
    /// whose value is missing or not numeric follow in team-number order.
    ///
    /// # Errors
    /// * `StatError::UnknownKey` - The key does not resolve
    pub fn ranking(
        &self,
        key: &NamespacedKey,
        teams: &[TeamNumber],
        func: Option<AggregateFn>,
    ) -> Result<Ranking, StatError> {
        let function = func.unwrap_or_else(|| self.dataset.default_function(key));
        let negative = self.dataset.is_negative(key)?;

        let values = self.dataset.compute_team_stats(key, teams, Some(function))?;

        let mut valued: Vec<(RankedTeam, f64)> = Vec::with_capacity(teams.len());
        let mut unvalued: Vec<RankedTeam> = Vec::new();
        for (&team, value) in teams.iter().zip(values) {
            match value.as_f64() {
                Some(number) => valued.push((RankedTeam { team, value }, number)),
                None => unvalued.push(RankedTeam { team, value }),
            }
        }

        valued.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        if negative {
            valued.reverse();
        }
        unvalued.sort_by_key(|entry| entry.team);

        debug!(
            "Ranked {} teams by {} ({}), {} without data",
            valued.len(),
            key,
            function,
            unvalued.len()
        );

        let entries = valued
            .into_iter()
            .map(|(entry, _)| entry)
            .chain(unvalued)
            .collect();

        Ok(Ranking {
            key: key.clone(),
            function,
            negative,
            entries,
        })
    }
}
