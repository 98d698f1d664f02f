//! Parsed `<namespace>.<id>` keys.
//!
//! Keys are parsed once when configuration loads, so reads never
//! re-split strings.

use crate::utils::error::StatError;
use std::fmt;
use std::str::FromStr;

/// Where a key's value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    /// Raw scouted inputs
    Result,
    /// Imported official results
    Fms,
    /// User-defined derived stats
    Smart,
    /// Identity attributes
    Meta,
}

impl Namespace {
    pub const ALL: [Namespace; 4] = [
        Namespace::Result,
        Namespace::Fms,
        Namespace::Smart,
        Namespace::Meta,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            Namespace::Result => "result",
            Namespace::Fms => "fms",
            Namespace::Smart => "smart",
            Namespace::Meta => "meta",
        }
    }
}

impl FromStr for Namespace {
    type Err = StatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Namespace::ALL
            .into_iter()
            .find(|ns| ns.prefix() == s)
            .ok_or_else(|| StatError::UnknownKey(s.to_string()))
    }
}

/// A validated namespaced key, optionally narrowed to one option
/// (`result.climb.2` counts selections of option 2)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespacedKey {
    pub namespace: Namespace,
    pub id: String,
    pub option: Option<usize>,
}

impl NamespacedKey {
    pub fn new(namespace: Namespace, id: impl Into<String>) -> Self {
        Self {
            namespace,
            id: id.into(),
            option: None,
        }
    }

    pub fn result(id: impl Into<String>) -> Self {
        Self::new(Namespace::Result, id)
    }

    pub fn smart(id: impl Into<String>) -> Self {
        Self::new(Namespace::Smart, id)
    }

    /// The key without any option narrowing
    pub fn base(&self) -> NamespacedKey {
        Self::new(self.namespace, self.id.clone())
    }

    pub fn with_option(mut self, option: usize) -> Self {
        self.option = Some(option);
        self
    }
}

impl FromStr for NamespacedKey {
    type Err = StatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || StatError::UnknownKey(s.to_string());
        let mut parts = s.trim().splitn(3, '.');
        let namespace: Namespace = parts.next().ok_or_else(unknown)?.parse().map_err(|_| unknown())?;
        let id = parts.next().filter(|id| is_identifier(id)).ok_or_else(unknown)?;
        let option = match parts.next() {
            Some(index) => Some(index.parse::<usize>().map_err(|_| unknown())?),
            None => None,
        };

        Ok(NamespacedKey {
            namespace,
            id: id.to_string(),
            option,
        })
    }
}

impl fmt::Display for NamespacedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace.prefix(), self.id)?;
        if let Some(option) = self.option {
            write!(f, ".{}", option)?;
        }
        Ok(())
    }
}

/// Ids are lowercase-ish identifiers: letters, digits and underscores
pub fn is_identifier(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        let key: NamespacedKey = "smart.auto_total".parse().unwrap();
        assert_eq!(key, NamespacedKey::smart("auto_total"));
        assert_eq!(key.to_string(), "smart.auto_total");
    }

    #[test]
    fn test_parse_option_suffix() {
        let key: NamespacedKey = "result.climb.2".parse().unwrap();
        assert_eq!(key.option, Some(2));
        assert_eq!(key.base(), NamespacedKey::result("climb"));
    }

    #[test]
    fn test_parse_rejects_bad_keys() {
        for bad in ["stats.x", "result", "result.", "result.a b", "result.x.first", "x"] {
            assert!(
                matches!(bad.parse::<NamespacedKey>(), Err(StatError::UnknownKey(_))),
                "{} should not parse",
                bad
            );
        }
    }
}
