//! Error types for the outbound calling system.

use thiserror::Error;

use crate::domain::lead::LeadId;

/// Result type alias using the outdial error type.
pub type Result<T> = std::result::Result<T, OutdialError>;

/// Main error type for the outbound calling system.
#[derive(Error, Debug)]
pub enum OutdialError {
    /// Lead not found
    #[error("Lead not found: {0}")]
    LeadNotFound(LeadId),

    /// CSV input too short to carry any data
    #[error("CSV must contain at least a header row and one data row")]
    CsvFormat,

    /// No header token matched a name column
    #[error("CSV must contain a name column. Found columns: {}", .headers.join(", "))]
    MissingNameColumn { headers: Vec<String> },

    /// No header token matched a phone column
    #[error("CSV must contain a phone or number column. Found columns: {}", .headers.join(", "))]
    MissingPhoneColumn { headers: Vec<String> },

    /// Every data row was rejected during ingestion
    #[error("No valid leads found in the CSV input")]
    NoValidRows,

    /// A bulk run was started with nothing selected
    #[error("No leads selected")]
    NoSelection,

    /// A dispatch was requested while a bulk run is active
    #[error("A bulk call run is already in progress")]
    RunInProgress,

    /// Validation error (e.g., missing required fields on manual entry)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Telephony transport error
    #[error("Call request failed: {0}")]
    Telephony(#[from] reqwest::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error from the durable store
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// General error from anyhow
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
