//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use thiserror::Error;

/// Errors raised while resolving keys or evaluating stats
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatError {
    #[error("Unknown key: {0}")]
    UnknownKey(String),

    #[error("Circular smart stat dependency: {}", .0.join(" -> "))]
    CircularDependency(Vec<String>),

    /// Non-fatal: a referenced key had no value for the subject
    #[error("Missing operand: {0}")]
    MissingOperand(String),
}

impl StatError {
    /// Whether this error only degrades the current subject to "no data"
    pub fn is_subject_local(&self) -> bool {
        !matches!(self, StatError::UnknownKey(_))
    }
}

/// A smart stat definition rejected at load time
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid smart stat '{id}': {reason}")]
pub struct InvalidDefinitionError {
    pub id: String,
    pub reason: String,
}

impl InvalidDefinitionError {
    pub fn new(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// A math expression that failed to parse
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message} at position {position}")]
pub struct ExpressionError {
    pub position: usize,
    pub message: String,
}

impl ExpressionError {
    pub fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

/// Errors that can occur while parsing input JSON
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("JSON deserialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid input format: {0}")]
    InvalidFormat(String),
}

/// Errors raised by record store mutations
#[derive(Error, Debug, PartialEq)]
pub enum StoreError {
    #[error("No record with id {0}")]
    UnknownRecord(usize),
}

/// Errors raised by picklist editing
#[derive(Error, Debug, PartialEq)]
pub enum PicklistError {
    #[error("List \"{0}\" already exists")]
    AlreadyExists(String),

    #[error("List \"{0}\" does not exist")]
    NotFound(String),

    #[error("Team {team} is not in list \"{list}\"")]
    TeamNotListed { list: String, team: String },
}

/// Errors that can occur during file input and output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to access file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to (de)serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    Parse(#[from] ParseError),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}

/// Errors that can occur while loading engine settings
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
