//! Error types for delimited-text readers and writers

use thiserror::Error;

use bindata_core::error::Error as CoreError;

/// Error type for readers, writers and the schema prober
#[derive(Error, Debug)]
pub enum Error {
    /// Core library error
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV format error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Delimiter or header could not be inferred
    #[error("Schema error: {0}")]
    Schema(String),

    /// Input path or content is unusable
    #[error("Input error: {0}")]
    Input(String),

    /// A chunk file could not be written
    #[error("Persistence error for label '{label}': {reason}")]
    Persistence {
        /// Label being persisted
        label: String,
        /// What went wrong
        reason: String,
    },

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type for readers
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for CoreError {
    fn from(e: Error) -> Self {
        match e {
            Error::Core(e) => e,
            Error::Io(e) => CoreError::Io(e),
            Error::Csv(e) => CoreError::Input(e.to_string()),
            Error::Schema(msg) => CoreError::Schema(msg),
            Error::Input(msg) => CoreError::Input(msg),
            Error::Persistence { label, reason } => CoreError::Persistence { label, reason },
            Error::InvalidArgument(msg) => CoreError::InvalidArgument(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_keeps_kind() {
        let core: CoreError = Error::Schema("ambiguous delimiter".into()).into();
        assert!(matches!(core, CoreError::Schema(_)));

        let core: CoreError = Error::Persistence {
            label: "chr1".into(),
            reason: "read-only".into(),
        }
        .into();
        assert!(!core.is_fatal());

        let core: CoreError = Error::Core(CoreError::aggregation("chr2", "empty")).into();
        assert!(matches!(core, CoreError::Aggregation { ref label, .. } if label == "chr2"));
    }
}
