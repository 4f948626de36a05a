//! Error types for Redmine operations

use thiserror::Error;

/// Result type for Redmine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during Redmine operations
#[derive(Error, Debug)]
pub enum Error {
    /// Transport error (connection refused, timeout, TLS, ...)
    #[error("Redmine request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Authentication or authorization error
    #[error("Redmine authentication error: {0}")]
    Auth(String),

    /// Resource not found
    #[error("Redmine resource not found: {0}")]
    NotFound(String),

    /// Validation errors returned by Redmine (HTTP 422)
    #[error("Redmine rejected the request: {}", .0.join(", "))]
    Rejected(Vec<String>),

    /// Any other non-success status
    #[error("Redmine returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Invalid base URL
    #[error("Invalid Redmine URL: {0}")]
    Url(#[from] url::ParseError),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Project identifier did not match any project
    #[error("Project '{0}' not found")]
    ProjectNotFound(String),

    /// Issue belongs to a different project than the accessor
    #[error("Issue project {found:?} does not match accessor project {expected:?}")]
    ProjectMismatch {
        expected: Option<u64>,
        found: u64,
    },

    /// Issue id does not match the id carried by the update request
    #[error("Issue ID not match: expected {expected}, found {found}")]
    IdMismatch { expected: String, found: u64 },

    /// Update attempted on an issue that was never saved
    #[error("Issue has no id; create it instead of updating")]
    MissingId,

    /// A name could not be resolved and the policy refuses to clear it
    #[error("Unknown {kind} '{name}' (known: {})", .known.join(", "))]
    UnknownName {
        kind: &'static str,
        name: String,
        known: Vec<String>,
    },
}
