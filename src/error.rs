//! Error taxonomy shared across the resolution engine and the API layer.

use thiserror::Error;

/// Errors that can occur while planning or running a resolution job
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("{0}")]
    Validation(String),

    #[error("model not found for entity type '{0}'")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("search backend error: {0}")]
    Backend(String),

    #[error("resolution job was cancelled")]
    Cancelled,
}

impl ResolutionError {
    /// Shorthand for a validation error with a formatted message
    pub fn validation(msg: impl Into<String>) -> Self {
        ResolutionError::Validation(msg.into())
    }

    /// Shorthand for a request error with a formatted message
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ResolutionError::BadRequest(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ResolutionError>;
