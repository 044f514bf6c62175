//! API error handling module
//!
//! Provides a unified error type for all API endpoints with structured error
//! variants, status mapping and sanitized client messages.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::store::StoreError;

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - client provided invalid input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Registration conflict - a center with this name already exists
    #[error("Duplicate center name: {0}")]
    DuplicateName(String),

    /// Not found - requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request timeout - operation took too long
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Internal server error - unexpected server-side failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Service unavailable - required service is not configured or available
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Upstream collaborator failure (geocoder, analysis service)
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Siren core error - error from the triage/analysis library
    #[error("Siren error: {0}")]
    Siren(#[from] siren_core::SirenError),
}

impl ApiError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a service unavailable error
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Create an upstream collaborator error
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::DuplicateName(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Siren(ref e) => match e {
                // Collaborator failures on this input → 422
                siren_core::SirenError::TranscriptionFailed(_)
                | siren_core::SirenError::AnalysisFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,

                // External service failures → 502
                siren_core::SirenError::GeocodingFailed(_)
                | siren_core::SirenError::HttpError(_) => StatusCode::BAD_GATEWAY,
            },
        }
    }

    /// Get the error code for programmatic error handling
    fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::DuplicateName(_) => "DUPLICATE_NAME",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Timeout(_) => "TIMEOUT",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Upstream(_) => "UPSTREAM_ERROR",
            Self::Siren(ref e) => match e {
                siren_core::SirenError::TranscriptionFailed(_) => "TRANSCRIPTION_FAILED",
                siren_core::SirenError::AnalysisFailed(_) => "ANALYSIS_FAILED",
                siren_core::SirenError::GeocodingFailed(_) => "GEOCODING_FAILED",
                siren_core::SirenError::HttpError(_) => "UPSTREAM_ERROR",
            },
        }
    }

    /// Get sanitized error message for client response
    fn client_message(&self) -> String {
        match self {
            // Collaborator errors can embed transport details; sanitize them.
            Self::Siren(ref e) => match e {
                siren_core::SirenError::TranscriptionFailed(_) => {
                    "Audio transcription failed".to_string()
                }
                siren_core::SirenError::AnalysisFailed(_) => "Audio analysis failed".to_string(),
                siren_core::SirenError::GeocodingFailed(_) => {
                    "Location lookup failed".to_string()
                }
                siren_core::SirenError::HttpError(_) => "Upstream service error".to_string(),
            },
            _ => self.to_string(),
        }
    }

    /// Get the error category for logging
    fn error_category(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::DuplicateName(_) => "duplicate_name",
            Self::NotFound(_) => "not_found",
            Self::Timeout(_) => "timeout",
            Self::Internal(_) => "internal",
            Self::ServiceUnavailable(_) => "service_unavailable",
            Self::Upstream(_) => "upstream",
            Self::Siren(_) => "siren",
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            // Registration conflict is a client error, everything else from
            // the storage layer is fatal to the request.
            StoreError::DuplicateName(name) => ApiError::DuplicateName(name),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let category = self.error_category();
        let code = self.error_code();
        let internal_message = self.to_string();
        let client_message = self.client_message();

        // Log based on severity, always including internal details
        match &self {
            Self::BadRequest(_) | Self::NotFound(_) | Self::DuplicateName(_) => {
                tracing::warn!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %internal_message,
                    "Client error"
                );
            }
            Self::ServiceUnavailable(_) | Self::Upstream(_) => {
                tracing::warn!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %internal_message,
                    "Service unavailable"
                );
            }
            Self::Timeout(_) | Self::Internal(_) => {
                tracing::error!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %internal_message,
                    "Server error"
                );
            }
            Self::Siren(_) => {
                tracing::error!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %internal_message,
                    client_message = %client_message,
                    "Collaborator error (internal details logged)"
                );
            }
        }

        // All error responses include a `code` field for programmatic error
        // handling
        let body = serde_json::json!({
            "error": client_message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::bad_request("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::DuplicateName("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(ApiError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::internal("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::upstream("x").status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_siren_error_mapping() {
        let err = ApiError::from(siren_core::SirenError::TranscriptionFailed("bad".into()));
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.client_message(), "Audio transcription failed");
    }

    #[test]
    fn test_duplicate_name_from_store_error() {
        let err = ApiError::from(StoreError::DuplicateName("Central".into()));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }
}
