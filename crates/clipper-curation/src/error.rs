//! Curation error types.

use thiserror::Error;

/// Result type for curation operations.
pub type CurationResult<T> = Result<T, CurationError>;

/// Errors raised by the curation stages.
///
/// Individual clips are never an error: they are rejected with a reason.
/// Only malformed configuration fails.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CurationError {
    #[error("Invalid criteria: {0}")]
    InvalidCriteria(String),
}

impl CurationError {
    pub fn invalid_criteria(msg: impl Into<String>) -> Self {
        Self::InvalidCriteria(msg.into())
    }
}
