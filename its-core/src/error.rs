//! Error types for ITS accessors

use thiserror::Error;

/// Result type alias for ITS core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for ITS core operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A labeled field value that cannot be converted to its target type
    #[error("Invalid value for field '{label}': {value:?}")]
    InvalidField { label: String, value: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
