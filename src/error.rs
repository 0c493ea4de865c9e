//! Error types for the bilr-cohorts library.

use thiserror::Error;

/// Main error type for the library.
///
/// Row-level problems (malformed counts, filtered samples) are not errors;
/// they are tallied as [`crate::data::Exclusion`] values. Only table-level
/// failures surface here.
#[derive(Error, Debug)]
pub enum BilrError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing column '{0}' in sample table")]
    MissingColumn(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid contingency table: {0}")]
    InvalidContingencyTable(String),

    #[error("Unknown cohort '{label}' in analysis '{analysis}'")]
    UnknownCohort { analysis: String, label: String },

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, BilrError>;
