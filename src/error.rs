//! Error types for Relaygate
//!
//! Probe failures and unknown relays are recovered locally and never show up
//! here. What remains are the outcomes a caller has to branch on.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Relay-level errors
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Invalid GraphQL request body: {0}")]
    InvalidRequestBody(String),

    #[error("Target is outside the upstream API: {0}")]
    InvalidTarget(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("No healthy relay available")]
    NoHealthyRelay,

    #[error("Upstream error: {0}")]
    UpstreamError(String),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl RelayError {
    /// Stable machine-readable code for the error body
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::InvalidRequestBody(_) => "INVALID_REQUEST_BODY",
            RelayError::InvalidTarget(_) => "INVALID_TARGET",
            RelayError::BadRequest(_) => "BAD_REQUEST",
            RelayError::NoHealthyRelay => "NO_HEALTHY_RELAY",
            RelayError::UpstreamError(_) | RelayError::HttpError(_) => "UPSTREAM_ERROR",
            RelayError::JsonError(_) => "INVALID_JSON",
            RelayError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error details
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            RelayError::InvalidRequestBody(_) | RelayError::InvalidTarget(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            RelayError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            RelayError::NoHealthyRelay => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            RelayError::UpstreamError(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            RelayError::HttpError(_) => {
                (StatusCode::BAD_GATEWAY, "Upstream relay error".to_string())
            }
            RelayError::JsonError(_) => {
                (StatusCode::BAD_REQUEST, "Invalid JSON in request".to_string())
            }
            RelayError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code().to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for convenience
pub type RelayResult<T> = Result<T, RelayError>;
