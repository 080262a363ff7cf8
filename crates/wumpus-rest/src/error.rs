//! REST error types

use thiserror::Error;

/// REST collaborator error type
#[derive(Debug, Error)]
pub enum RestError {
    /// Request could not be sent or the body could not be read
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// Body was not the expected JSON shape
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl RestError {
    /// Check whether the credential was rejected
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401, .. })
    }
}

/// REST result type
pub type RestResult<T> = Result<T, RestError>;
