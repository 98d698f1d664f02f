//! Named, ordered team lists built from rankings.
//!
//! Persisted wholesale as `{ "<name>": ["<team>", ...] }`.

use crate::utils::config::PICKED_LIST;
use crate::utils::error::PicklistError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Picklists {
    lists: BTreeMap<String, Vec<String>>,
}

impl Picklists {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.lists.get(name).map(|list| list.as_slice())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.lists.keys().map(|name| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Add an empty list
    pub fn create(&mut self, name: &str) -> Result<(), PicklistError> {
        if self.lists.contains_key(name) {
            return Err(PicklistError::AlreadyExists(name.to_string()));
        }
        self.lists.insert(name.to_string(), Vec::new());
        Ok(())
    }

    /// Create or overwrite a list, e.g. from a ranking
    pub fn replace(&mut self, name: &str, teams: Vec<String>) {
        debug!("Saving list \"{}\" with {} teams", name, teams.len());
        self.lists.insert(name.to_string(), teams);
    }

    pub fn rename(&mut self, from: &str, to: &str) -> Result<(), PicklistError> {
        if self.lists.contains_key(to) {
            return Err(PicklistError::AlreadyExists(to.to_string()));
        }
        let teams = self
            .lists
            .remove(from)
            .ok_or_else(|| PicklistError::NotFound(from.to_string()))?;
        self.lists.insert(to.to_string(), teams);
        Ok(())
    }

    pub fn delete(&mut self, name: &str) -> Result<Vec<String>, PicklistError> {
        self.lists
            .remove(name)
            .ok_or_else(|| PicklistError::NotFound(name.to_string()))
    }

    /// Place a team right after another, or at the front when `after` is `None`
    ///
    /// A team already in the list is moved. Inserting a team after itself
    /// changes nothing.
    pub fn insert_after(
        &mut self,
        name: &str,
        team: &str,
        after: Option<&str>,
    ) -> Result<(), PicklistError> {
        if after == Some(team) {
            return Ok(());
        }
        let list = self
            .lists
            .get_mut(name)
            .ok_or_else(|| PicklistError::NotFound(name.to_string()))?;

        list.retain(|t| t != team);
        let index = match after {
            Some(after) => {
                list.iter()
                    .position(|t| t == after)
                    .ok_or_else(|| PicklistError::TeamNotListed {
                        list: name.to_string(),
                        team: after.to_string(),
                    })?
                    + 1
            }
            None => 0,
        };
        list.insert(index, team.to_string());
        Ok(())
    }

    pub fn remove_team(&mut self, name: &str, team: &str) -> Result<(), PicklistError> {
        let list = self
            .lists
            .get_mut(name)
            .ok_or_else(|| PicklistError::NotFound(name.to_string()))?;
        let index = list
            .iter()
            .position(|t| t == team)
            .ok_or_else(|| PicklistError::TeamNotListed {
                list: name.to_string(),
                team: team.to_string(),
            })?;
        list.remove(index);
        Ok(())
    }

    /// Toggle a team in the reserved picked list
    ///
    /// # Returns
    /// Whether the team is now picked
    pub fn cross_out(&mut self, team: &str) -> bool {
        let picked = self.lists.entry(PICKED_LIST.to_string()).or_default();
        match picked.iter().position(|t| t == team) {
            Some(index) => {
                picked.remove(index);
                false
            }
            None => {
                picked.push(team.to_string());
                true
            }
        }
    }

    pub fn is_picked(&self, team: &str) -> bool {
        self.get(PICKED_LIST)
            .map_or(false, |picked| picked.iter().any(|t| t == team))
    }

    /// Drop every empty list
    pub fn prune_empty(&mut self) -> usize {
        let before = self.lists.len();
        self.lists.retain(|_, teams| !teams.is_empty());
        before - self.lists.len()
    }
}
