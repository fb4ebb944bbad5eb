//! Error types for the server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::causal::CausalError;
use crate::dataset::DatasetError;
use crate::shell::ShellError;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    /// Session not found
    SessionNotFound(Uuid),
    /// Too many concurrent sessions
    SessionLimitReached,
    /// Uploaded file could not be loaded
    InvalidDataset(String),
    /// The causal engine failed
    AnalysisFailed(String),
    /// Invalid parameter in request
    InvalidParameter(String),
    /// Internal server error
    InternalError(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::SessionNotFound(id) => write!(f, "Session not found: {}", id),
            ApiError::SessionLimitReached => write!(f, "Session limit reached"),
            ApiError::InvalidDataset(msg) => write!(f, "Invalid dataset: {}", msg),
            ApiError::AnalysisFailed(msg) => write!(f, "Analysis failed: {}", msg),
            ApiError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::SessionNotFound(id) => (
                StatusCode::NOT_FOUND,
                "SessionNotFound",
                format!("Session '{}' not found", id),
            ),
            ApiError::SessionLimitReached => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SessionLimitReached",
                "Maximum number of concurrent sessions reached".to_string(),
            ),
            ApiError::InvalidDataset(msg) => {
                (StatusCode::BAD_REQUEST, "InvalidDataset", msg.clone())
            }
            ApiError::AnalysisFailed(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "AnalysisFailed",
                msg.clone(),
            ),
            ApiError::InvalidParameter(msg) => {
                (StatusCode::BAD_REQUEST, "InvalidParameter", msg.clone())
            }
            ApiError::InternalError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalError",
                msg.clone(),
            ),
        };

        tracing::warn!(error = error_type, "{}", message);

        let body = Json(json!({
            "error": error_type,
            "message": message,
        }));

        (status, body).into_response()
    }
}

// Conversions from other error types

impl From<DatasetError> for ApiError {
    fn from(err: DatasetError) -> Self {
        ApiError::InvalidDataset(err.to_string())
    }
}

impl From<CausalError> for ApiError {
    fn from(err: CausalError) -> Self {
        ApiError::AnalysisFailed(err.to_string())
    }
}

impl From<ShellError> for ApiError {
    fn from(err: ShellError) -> Self {
        match err {
            ShellError::Analysis(err) => err.into(),
            ShellError::Render(err) => ApiError::InternalError(err.to_string()),
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        ApiError::InvalidParameter(format!("Multipart error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (ApiError::SessionNotFound(Uuid::nil()), StatusCode::NOT_FOUND),
            (ApiError::SessionLimitReached, StatusCode::SERVICE_UNAVAILABLE),
            (
                ApiError::InvalidDataset("bad".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::AnalysisFailed("cycle".to_string()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_engine_errors_become_analysis_failures() {
        let err: ApiError = ShellError::Analysis(CausalError::SingularDesign).into();
        assert!(matches!(err, ApiError::AnalysisFailed(msg) if msg.contains("singular")));
    }
}
