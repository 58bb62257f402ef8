//! Error types for the app server.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use plcc_exec::ExecError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request body is not usable at all.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A field is missing or has the wrong shape.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Payload too large.
    #[error("Payload too large")]
    PayloadTooLarge,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Validation(_) => "validation_error",
            Self::PayloadTooLarge => "payload_too_large",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Message sent to the client.
    ///
    /// Client errors carry their text as-is; the prefixed `Display` form is
    /// for logs.
    pub fn client_message(&self) -> String {
        match self {
            Self::BadRequest(message) | Self::Validation(message) => message.clone(),
            Self::PayloadTooLarge | Self::Internal(_) => self.to_string(),
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type.
    pub error: ErrorDetail,
}

/// Error detail.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if let Self::Internal(message) = &self {
            error!(error = %message, "Request failed");
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.client_message(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for the app server.
pub type AppResult<T> = Result<T, AppError>;

impl From<ExecError> for AppError {
    fn from(error: ExecError) -> Self {
        Self::Internal(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AppError::BadRequest("test".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Validation("test".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::PayloadTooLarge.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            AppError::Internal("test".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_client_errors_send_bare_message() {
        let err = AppError::Validation("Missing or invalid 'plc_xml' field in request body.".into());
        assert_eq!(
            err.client_message(),
            "Missing or invalid 'plc_xml' field in request body."
        );
        let err = AppError::BadRequest("Request body must be valid JSON.".into());
        assert_eq!(err.client_message(), "Request body must be valid JSON.");
        assert_eq!(
            AppError::Internal("disk full".into()).client_message(),
            "Internal error: disk full"
        );
    }

    #[test]
    fn test_exec_errors_are_internal() {
        let err: AppError = ExecError::InvalidFileName {
            name: "../x".into(),
            reason: "name is not a plain file name",
        }
        .into();
        assert_eq!(err.error_code(), "internal_error");
        assert!(err.to_string().contains("../x"));
    }
}
