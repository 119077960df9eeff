//! Error types for logslice

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for logslice operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for logslice
///
/// Running out of data is not an error: exhausted sources and chains are
/// reported as `None` or [`Pull::EndOfAll`](crate::storage::Pull).
#[derive(Error, Debug)]
pub enum Error {
    /// A `start,end[,name]` window string could not be parsed
    #[error("Malformed segment specification: {0}")]
    MalformedSpecification(String),

    /// Nothing to process (no input files or no usable segments)
    #[error("No input: {0}")]
    NoInput(String),

    /// A single input file could not be opened
    #[error("Failed to open {}: {reason}", .path.display())]
    Open { path: PathBuf, reason: String },

    /// Record file corruption or format errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
