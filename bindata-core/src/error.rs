//! Error types for bin-data pipelines

use std::io;
use thiserror::Error;

/// Result type for bin-data pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for bin-data pipeline operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Delimiter or header inference failed, or the schema is inconsistent
    #[error("Schema error: {0}")]
    Schema(String),

    /// Input path is neither a readable file nor a valid chunk directory
    #[error("Input error: {0}")]
    Input(String),

    /// A label's rows cannot be sliced or aggregated under the requested policy
    #[error("Aggregation error for label '{label}': {reason}")]
    Aggregation {
        /// Label whose rows were being binned
        label: String,
        /// What went wrong
        reason: String,
    },

    /// A label's rows could not be written to its chunk file
    #[error("Persistence error for label '{label}': {reason}")]
    Persistence {
        /// Label whose rows were being persisted
        label: String,
        /// What went wrong
        reason: String,
    },

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Build an aggregation error for `label`
    pub fn aggregation(label: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Aggregation {
            label: label.into(),
            reason: reason.into(),
        }
    }

    /// Build a persistence error for `label`
    pub fn persistence(label: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Persistence {
            label: label.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error aborts the whole run rather than a single label
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Aggregation { .. } | Error::Persistence { .. })
    }
}
