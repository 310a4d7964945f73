//! Error Handling
//!
//! Unified error types for the application.
//! Uses thiserror for ergonomic error definitions; `IntoResponse` maps each
//! variant onto the HTTP error body clients receive before streaming starts.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use visa_advisor_llm::LlmError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML config parse errors
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Malformed or invalid request body
    #[error("{message}")]
    BadRequest {
        message: String,
        details: Vec<String>,
    },

    /// Client exceeded its request quota
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Reasoning backend errors outside a running task
    #[error("Backend error: {0}")]
    Backend(#[from] LlmError),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a bad request error without details
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest {
            message: msg.into(),
            details: Vec::new(),
        }
    }

    /// Create a validation error carrying every violated rule
    pub fn validation(details: Vec<String>) -> Self {
        Self::BadRequest {
            message: "Validation failed".to_string(),
            details,
        }
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error body
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<String>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            AppError::BadRequest { message, details } => ErrorBody {
                error: message,
                details: (!details.is_empty()).then_some(details),
            },
            AppError::RateLimited(_) => ErrorBody {
                error: self.to_string(),
                details: None,
            },
            other => {
                tracing::error!("[Server] request failed before streaming: {}", other);
                ErrorBody {
                    error: "Internal server error".to_string(),
                    details: None,
                }
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<visa_advisor_core::CoreError> for AppError {
    fn from(err: visa_advisor_core::CoreError) -> Self {
        match err {
            visa_advisor_core::CoreError::Config(msg) => AppError::Config(msg),
            visa_advisor_core::CoreError::Validation(msg) => AppError::validation(vec![msg]),
            other => AppError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::config("bind address missing");
        assert_eq!(err.to_string(), "Configuration error: bind address missing");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::validation(vec!["x".into()]).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::rate_limited("slow down").status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AppError::internal("boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));
    }

    #[test]
    fn test_core_validation_maps_to_bad_request() {
        let err: AppError = visa_advisor_core::CoreError::validation("bad").into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
