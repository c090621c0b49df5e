//! Collaborator Client Error Types

use thiserror::Error;

/// Errors reported by remote collaborator clients
#[derive(Error, Debug)]
pub enum ClientError {
    /// The remote service answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The request could not be sent or the connection failed
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The response body did not have the expected shape
    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Create an HTTP status error
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(what: impl AsRef<str>) -> Self {
        Self::http(404, format!("{} not found", what.as_ref()))
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }
}
