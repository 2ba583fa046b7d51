//! Error handling and custom error types
//!
//! Provides unified error handling across the application using thiserror.
//! Rendering itself never fails; these cover catalog, form, storage and export.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Scenario not found: {0}")]
    ScenarioNotFound(String),

    #[error("History entry not found: {0}")]
    HistoryNotFound(String),

    #[error("Scenario '{scenario}' has no field '{field}'")]
    UnknownField { scenario: String, field: String },

    #[error("Invalid value for field '{field}': {reason}")]
    InvalidFieldValue { field: String, reason: String },

    #[error("Required fields missing: {}", .0.join(", "))]
    IncompleteForm(Vec<String>),

    #[error("Invalid assignment '{0}'. Expected format: field=value")]
    InvalidAssignment(String),
}

pub type Result<T> = std::result::Result<T, Error>;
