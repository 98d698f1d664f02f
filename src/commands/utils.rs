use super::models::EventArgs;
use crate::dataset::Dataset;
use crate::output::{load_config, load_fms, load_records};
use crate::parser::schema::FmsImport;
use crate::utils::config::{load_settings, EngineSettings, SCHEMA_VERSION};
use anyhow::{Context, Result};
use log::{info, warn};

/// Load every input file and build the dataset
///
/// **Public** - shared first step of the event commands
///
/// # Errors
/// * Any input file cannot be read or parsed
pub fn load_dataset(args: &EventArgs) -> Result<Dataset> {
    let records = load_records(&args.records)
        .with_context(|| format!("Failed to load records from {}", args.records.display()))?;

    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let fms = match &args.fms {
        Some(path) => load_fms(path)
            .with_context(|| format!("Failed to load official results from {}", path.display()))?,
        None => FmsImport::default(),
    };

    let settings = match &args.settings {
        Some(path) if path.exists() => load_settings(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        Some(path) => {
            warn!("Settings file {} not found, using defaults", path.display());
            EngineSettings::default()
        }
        None => EngineSettings::default(),
    };

    let dataset = Dataset::new(records, config, fms, settings);
    for error in dataset.definition_errors() {
        warn!("{}", error);
    }
    info!("Event loaded: {} teams", dataset.teams().len());
    Ok(dataset)
}

/// Display version information
pub fn display_version() {
    println!("Scout Stats v{}", env!("CARGO_PKG_VERSION"));
    println!("Config Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Derived stats, aggregation and rankings for competition scouting data.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn json_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn test_load_dataset_defaults_settings() {
        let records = json_file(r#"[{"team": 1, "match_key": "e_qm1", "fields": {"auto": 3}}]"#);
        let config = json_file(r#"{"fields": [{"id": "auto", "name": "Auto", "type": "counter"}]}"#);
        let args = EventArgs {
            records: records.path().to_path_buf(),
            config: config.path().to_path_buf(),
            fms: None,
            settings: Some(PathBuf::from("does-not-exist.toml")),
        };

        let dataset = load_dataset(&args).unwrap();
        assert_eq!(dataset.teams(), vec![1]);
        assert_eq!(dataset.settings(), &EngineSettings::default());
    }

    #[test]
    fn test_load_dataset_missing_records() {
        let config = json_file(r#"{"fields": []}"#);
        let args = EventArgs {
            records: PathBuf::from("no-such-records.json"),
            config: config.path().to_path_buf(),
            fms: None,
            settings: None,
        };

        let err = load_dataset(&args).unwrap_err();
        assert!(err.to_string().contains("Failed to load records"));
    }
}
