//! HTTP error handling
//!
//! Every failure leaves the server as a `{message, code, details?}` JSON
//! body. The status is derived from the code, except for form storage
//! failures which pass the storage service's own status through.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use formbuilder_core::FormServiceError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpError {
    /// User-facing error message
    pub message: String,
    /// Machine-readable error code
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Status passed through from an upstream service
    #[serde(skip)]
    pub status: Option<u16>,
}

impl HttpError {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: None,
            status: None,
        }
    }

    pub fn with_details(
        message: impl Into<String>,
        code: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            details: Some(details.into()),
            ..Self::new(message, code)
        }
    }

    fn status_code(&self) -> StatusCode {
        if let Some(status) = self.status.and_then(|s| StatusCode::from_u16(s).ok()) {
            return status;
        }
        match self.code.as_str() {
            "UNPROCESSABLE" | "INVALID_PATCH" => StatusCode::UNPROCESSABLE_ENTITY,
            "CATALOG_ERROR" | "TAXONOMY_ERROR" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

impl From<FormServiceError> for HttpError {
    fn from(err: FormServiceError) -> Self {
        match err {
            FormServiceError::Unprocessable(message) => HttpError::new(message, "UNPROCESSABLE"),
            FormServiceError::Store { status, message } => HttpError {
                status: Some(status),
                ..HttpError::new(message, "STORE_ERROR")
            },
            FormServiceError::Catalog(message) => HttpError::new(message, "CATALOG_ERROR"),
            FormServiceError::Taxonomy(message) => HttpError::new(message, "TAXONOMY_ERROR"),
            FormServiceError::Patch(message) => HttpError::new(message, "INVALID_PATCH"),
            other @ FormServiceError::SerializationError(_) => HttpError::with_details(
                other.to_string(),
                "SERIALIZATION_ERROR",
                format!("{:?}", other),
            ),
        }
    }
}
