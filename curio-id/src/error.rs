//! Error types for curio-id

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::PhotoError;
use crate::workflow::{PipelineError, TransitionError};

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - e.g. event not allowed in the run's current stage
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Upstream service failed (502)
    #[error("Upstream error: {0}")]
    BadGateway(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// curio-common error
    #[error("Common error: {0}")]
    Common(#[from] curio_common::Error),
}

impl From<PhotoError> for ApiError {
    fn from(err: PhotoError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Transition(TransitionError::CandidateOutOfRange { .. }) => {
                ApiError::BadRequest(err.to_string())
            }
            PipelineError::Transition(_) | PipelineError::Cancelled => {
                ApiError::Conflict(err.to_string())
            }
            PipelineError::Validation(_) => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Other(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
            ApiError::Common(curio_common::Error::NotFound(msg)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", msg)
            }
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::SubmissionError;
    use curio_common::events::PipelineStage;

    #[test]
    fn test_pipeline_error_mapping() {
        let illegal = PipelineError::Transition(TransitionError::Illegal {
            stage: PipelineStage::Form,
            event: crate::workflow::EventKind::CandidateSelected,
        });
        assert!(matches!(ApiError::from(illegal), ApiError::Conflict(_)));

        let range = PipelineError::Transition(TransitionError::CandidateOutOfRange {
            index: 9,
            count: 1,
        });
        assert!(matches!(ApiError::from(range), ApiError::BadRequest(_)));

        let invalid = PipelineError::Validation(SubmissionError::MissingTitle);
        assert!(matches!(ApiError::from(invalid), ApiError::BadRequest(_)));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::BadGateway("x".into()).into_response().status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::Common(curio_common::Error::NotFound("x".into()))
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
    }
}
