//! Configuration and constants for the engine and CLI.

use crate::aggregator::AggregateFn;
use crate::utils::error::SettingsError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Current input/output schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Aggregation used when neither the caller nor the stat names one
pub const DEFAULT_FUNCTION: AggregateFn = AggregateFn::Mean;

/// Decimal places used when rendering fractional numbers
pub const DEFAULT_DISPLAY_DECIMALS: usize = 2;

/// Rendered form of the "no data" sentinel
pub const NO_DATA_DISPLAY: &str = "---";

/// Reserved picklist holding teams that are already picked
pub const PICKED_LIST: &str = "picked";

/// Competition levels in play order (used to sort match keys)
pub const MATCH_LEVELS: &[&str] = &["qm", "ef", "qf", "sf", "f"];

/// Match level assumed for legacy records that only carry a match number
pub const LEGACY_MATCH_LEVEL: &str = "qm";

/// Tunable engine behaviour, optionally loaded from a TOML file
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EngineSettings {
    /// Aggregation applied when a request omits one
    #[serde(default = "default_function")]
    pub default_function: AggregateFn,

    /// Decimal places for fractional numbers in rendered output
    #[serde(default = "default_decimals")]
    pub display_decimals: usize,
}

fn default_function() -> AggregateFn {
    DEFAULT_FUNCTION
}

fn default_decimals() -> usize {
    DEFAULT_DISPLAY_DECIMALS
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_function: DEFAULT_FUNCTION,
            display_decimals: DEFAULT_DISPLAY_DECIMALS,
        }
    }
}

/// Load engine settings from a TOML file
///
/// # Errors
/// * `SettingsError::Io` - If file cannot be read
/// * `SettingsError::Parse` - If TOML is invalid
///
/// # Example
/// ```ignore
/// let settings = load_settings("scout-stats.toml")?;
/// ```
pub fn load_settings(path: impl AsRef<Path>) -> Result<EngineSettings, SettingsError> {
    let path = path.as_ref();
    debug!("Loading engine settings from: {}", path.display());
    let contents = fs::read_to_string(path)?;
    let settings: EngineSettings = toml::from_str(&contents)?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_settings_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_function = \"median\"").unwrap();

        let settings = load_settings(file.path()).unwrap();
        assert_eq!(settings.default_function, AggregateFn::Median);
        assert_eq!(settings.display_decimals, DEFAULT_DISPLAY_DECIMALS);
    }

    #[test]
    fn test_load_settings_invalid_function() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_function = \"average\"").unwrap();

        assert!(matches!(
            load_settings(file.path()),
            Err(SettingsError::Parse(_))
        ));
    }
}
