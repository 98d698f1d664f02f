//! Validate command implementation.
//!
//! Loads a configuration and reports every smart stat that would be
//! excluded from the working set, all at once.

use crate::dataset::Dataset;
use crate::output::load_config;
use crate::parser::schema::FmsImport;
use crate::utils::config::EngineSettings;
use crate::utils::error::InvalidDefinitionError;
use anyhow::{Context, Result};
use std::path::Path;

/// Check a configuration file and print a report
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * The config cannot be loaded
/// * One or more smart stats are invalid
pub fn execute_validate(config_path: &Path, fms_path: Option<&Path>) -> Result<()> {
    println!("Validating config: {}", config_path.display());

    let config = load_config(config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    let fms = match fms_path {
        Some(path) => crate::output::load_fms(path)
            .with_context(|| format!("Failed to load official results from {}", path.display()))?,
        None => FmsImport::default(),
    };

    let field_count = config.fields.len();
    let declared = config.smart_stats.len() + config.rejected_stats.len();
    let dataset = Dataset::new(Vec::new(), config, fms, EngineSettings::default());
    let errors = dataset.definition_errors();

    println!("  Fields: {}", field_count);
    println!("  Smart Stats: {} valid of {}", dataset.engine().len(), declared);

    if errors.is_empty() {
        println!("✓ Valid config");
        return Ok(());
    }

    println!("{}", format_errors(errors));
    anyhow::bail!("{} invalid smart stat(s)", errors.len())
}

/// One line per rejected definition
fn format_errors(errors: &[InvalidDefinitionError]) -> String {
    errors
        .iter()
        .map(|e| format!("  ✗ {}: {}", e.id, e.reason))
        .collect::<Vec<_>>()
        .join("\n")
}
