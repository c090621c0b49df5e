//! Service Layer Error Types
//!
//! This module defines the error type surfaced by the form compiler. Two
//! kinds are meant to be handled by callers:
//!
//! - `Unprocessable` - the Master is structurally invalid relative to the
//!   catalog (unknown field, prefixed context, bad language); maps to 422
//! - `Store` - the form storage reported an HTTP error while resolving
//!   inheritance; carries the storage status code
//!
//! Everything else (catalog or taxonomy failures, malformed patches) is
//! propagated as-is without retries.

use crate::clients::ClientError;
use thiserror::Error;

/// Form compiler errors
#[derive(Error, Debug)]
pub enum FormServiceError {
    /// Input is invalid relative to the catalog
    #[error("{0}")]
    Unprocessable(String),

    /// Form storage reported an HTTP error
    #[error("Form storage request failed with status {status}: {message}")]
    Store { status: u16, message: String },

    /// Metadata catalog lookup failed
    #[error("Metadata catalog request failed: {0}")]
    Catalog(String),

    /// Taxonomy lookup failed
    #[error("Taxonomy request failed: {0}")]
    Taxonomy(String),

    /// JSON Patch document could not be applied
    #[error("Invalid patch: {0}")]
    Patch(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl FormServiceError {
    /// Create an unprocessable input error
    pub fn unprocessable(msg: impl Into<String>) -> Self {
        Self::Unprocessable(msg.into())
    }

    /// Create the error for a field without a catalog property or literal type
    pub fn bad_field(name: impl AsRef<str>) -> Self {
        Self::Unprocessable(format!("Bad field {}", name.as_ref()))
    }

    /// Create a patch error
    pub fn patch(msg: impl Into<String>) -> Self {
        Self::Patch(msg.into())
    }

    /// Map a storage client failure, keeping the HTTP status when there is one
    pub fn from_store(err: ClientError) -> Self {
        match err {
            ClientError::Http { status, message } => Self::Store { status, message },
            other => Self::Store {
                status: 502,
                message: other.to_string(),
            },
        }
    }

    /// Map a metadata catalog client failure
    pub fn from_catalog(err: ClientError) -> Self {
        Self::Catalog(err.to_string())
    }

    /// Map a taxonomy client failure
    pub fn from_taxonomy(err: ClientError) -> Self {
        Self::Taxonomy(err.to_string())
    }

    pub fn is_unprocessable(&self) -> bool {
        matches!(self, Self::Unprocessable(_))
    }

    /// Storage status code, if this is a storage error
    pub fn store_status(&self) -> Option<u16> {
        match self {
            Self::Store { status, .. } => Some(*status),
            _ => None,
        }
    }
}
