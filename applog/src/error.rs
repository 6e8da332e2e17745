//! Error types for the log service.

use std::fmt;

/// Errors raised by the app stores.
#[derive(Debug, Clone)]
pub enum Error {
    /// Underlying storage failure.
    Storage(String),
    /// A field failed semantic validation (bad level, non-positive count).
    Validation(String),
    /// The request payload was structurally malformed.
    InvalidInput(String),
    /// A stored record could not be encoded or decoded.
    Encoding(String),
    /// The requested operation or resource does not exist.
    NotFound(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Storage(msg) => write!(f, "storage error: {}", msg),
            Error::Validation(msg) => write!(f, "validation error: {}", msg),
            Error::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
            Error::Encoding(msg) => write!(f, "encoding error: {}", msg),
            Error::NotFound(msg) => write!(f, "not found: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<common::StorageError> for Error {
    fn from(err: common::StorageError) -> Self {
        Error::Storage(err.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, Error>;
