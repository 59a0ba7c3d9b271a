//! API error handling module
//!
//! Provides a unified error type for all API endpoints with structured error variants.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use proofart_core::{AttestationError, ConfigurationError, VerificationError};
use thiserror::Error;

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - client provided invalid input
    #[error("{0}")]
    BadRequest(String),

    /// Missing or unusable credentials for an external service
    #[error("{0}")]
    Configuration(String),

    /// The generation service failed; the message carries its cause verbatim
    #[error("{0}")]
    Generation(String),

    /// The ledger could not be read
    #[error("{0}")]
    Ledger(String),
}

impl ApiError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Configuration(_) | Self::Generation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Ledger(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Get the error code for programmatic error handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Generation(_) => "GENERATION_FAILED",
            Self::Ledger(_) => "LEDGER_ERROR",
        }
    }

    /// Get the error category for logging
    fn error_category(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Configuration(_) => "configuration",
            Self::Generation(_) => "generation",
            Self::Ledger(_) => "ledger",
        }
    }
}

impl From<ConfigurationError> for ApiError {
    fn from(err: ConfigurationError) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<AttestationError> for ApiError {
    fn from(err: AttestationError) -> Self {
        match err {
            AttestationError::InvalidRequest(_) => Self::BadRequest(err.to_string()),
            AttestationError::Configuration(e) => e.into(),
            AttestationError::Generation(_) => Self::Generation(err.to_string()),
        }
    }
}

impl From<VerificationError> for ApiError {
    fn from(err: VerificationError) -> Self {
        match err {
            VerificationError::InvalidHash(_) | VerificationError::IncompleteClaim(_) => {
                Self::BadRequest(err.to_string())
            }
            VerificationError::Ledger(_) => Self::Ledger(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let category = self.error_category();
        let code = self.error_code();
        let message = self.to_string();

        match &self {
            Self::BadRequest(_) => {
                tracing::warn!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %message,
                    "Client error"
                );
            }
            Self::Ledger(_) => {
                tracing::warn!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %message,
                    "Ledger unavailable"
                );
            }
            Self::Configuration(_) | Self::Generation(_) => {
                tracing::error!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %message,
                    "Server error"
                );
            }
        }

        // All error responses include a `code` field for programmatic error handling
        let body = serde_json::json!({
            "error": message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}
