//! JSON input loading and picklist persistence.
//!
//! Reads records, configuration and official results from disk, and
//! writes picklists (or any serializable report) as pretty JSON.

use crate::parser::schema::{EventConfig, FmsImport, ResultRecord};
use crate::parser::{parse_config, parse_fms, parse_records};
use crate::ranking::Picklists;
use crate::utils::error::OutputError;
use log::{debug, info};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Read any JSON document
///
/// # Errors
/// * `OutputError::Io` - File cannot be opened
/// * `OutputError::SerializationFailed` - Contents are not valid JSON
pub fn read_json(input_path: impl AsRef<Path>) -> Result<serde_json::Value, OutputError> {
    let input_path = input_path.as_ref();
    debug!("Reading JSON from: {}", input_path.display());

    let file = File::open(input_path)?;
    let value = serde_json::from_reader(BufReader::new(file))?;
    Ok(value)
}

/// Load result records, skipping malformed entries
pub fn load_records(input_path: impl AsRef<Path>) -> Result<Vec<ResultRecord>, OutputError> {
    let records = parse_records(&read_json(input_path)?)?;
    info!("Loaded {} result records", records.len());
    Ok(records)
}

/// Load the field / smart stat / team configuration
pub fn load_config(input_path: impl AsRef<Path>) -> Result<EventConfig, OutputError> {
    Ok(parse_config(&read_json(input_path)?)?)
}

/// Load imported official results
pub fn load_fms(input_path: impl AsRef<Path>) -> Result<FmsImport, OutputError> {
    Ok(parse_fms(&read_json(input_path)?)?)
}

/// Write a value to a JSON file with pretty printing
///
/// **Public** - main entry point for JSON output
///
/// # Arguments
/// * `value` - Anything serializable (picklists, rankings)
/// * `output_path` - Path to output JSON file
///
/// # Errors
/// * `OutputError::Io` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path cannot be created or is invalid
pub fn write_json<T: Serialize>(value: &T, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    validate_output_path(output_path)?;

    // Create parent directories if needed
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    let file = File::create(output_path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)?;

    debug!(
        "Wrote {} ({} bytes)",
        output_path.display(),
        calculate_file_size(output_path)
    );
    Ok(())
}

/// Save every picklist, replacing the file wholesale
pub fn write_picklists(picklists: &Picklists, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();
    info!("Writing {} picklists to: {}", picklists.len(), output_path.display());
    write_json(picklists, output_path)
}

/// Read saved picklists; a missing file means no lists yet
pub fn read_picklists(input_path: impl AsRef<Path>) -> Result<Picklists, OutputError> {
    let input_path = input_path.as_ref();
    if !input_path.exists() {
        debug!("No picklists at {}, starting empty", input_path.display());
        return Ok(Picklists::new());
    }

    let file = File::open(input_path)?;
    let picklists: Picklists = serde_json::from_reader(BufReader::new(file))?;
    debug!("Picklists loaded: {} lists", picklists.len());
    Ok(picklists)
}

/// Validate that output path is writable
///
/// **Private** - internal validation
fn validate_output_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    // Check if we're trying to overwrite a directory
    if path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    Ok(())
}

/// Calculate file size in bytes
///
/// **Private** - internal utility
fn calculate_file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample_picklists() -> Picklists {
        let mut lists = Picklists::new();
        lists.replace("first pick", vec!["254".into(), "1678".into()]);
        lists.cross_out("971");
        lists
    }

    #[test]
    fn test_write_and_read_picklists() {
        let lists = sample_picklists();
        let temp_file = NamedTempFile::new().unwrap();

        write_picklists(&lists, temp_file.path()).unwrap();
        let loaded = read_picklists(temp_file.path()).unwrap();

        assert_eq!(loaded, lists);
    }

    #[test]
    fn test_picklist_file_shape() {
        let temp_file = NamedTempFile::new().unwrap();
        write_picklists(&sample_picklists(), temp_file.path()).unwrap();

        let raw = read_json(temp_file.path()).unwrap();
        assert_eq!(
            raw,
            serde_json::json!({"first pick": ["254", "1678"], "picked": ["971"]})
        );
    }

    #[test]
    fn test_read_missing_picklists_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let lists = read_picklists(temp_dir.path().join("none.json")).unwrap();
        assert!(lists.is_empty());
    }

    #[test]
    fn test_load_records_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"team": 1, "match_key": "e_qm1", "fields": {{"auto": 2}}}}, {{"team": "x"}}]"#
        )
        .unwrap();

        let records = load_records(file.path()).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_read_json_invalid() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            read_json(file.path()),
            Err(OutputError::SerializationFailed(_))
        ));
    }

    #[test]
    fn test_validate_output_path_empty() {
        assert!(validate_output_path(Path::new("")).is_err());
    }

    #[test]
    fn test_validate_output_path_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(validate_output_path(temp_dir.path()).is_err());
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested_path = temp_dir.path().join("nested/dirs/picklists.json");

        write_picklists(&sample_picklists(), &nested_path).unwrap();

        assert!(nested_path.exists());
    }
}
