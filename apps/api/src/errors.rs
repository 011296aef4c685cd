use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::cv::{PipelineError, GENERIC_FAILURE};

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Messages carried here are already safe to show; internal detail is logged
/// where the error happened and stops there.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    /// Every engine slot is busy; the client may retry later.
    #[error("Overloaded: {0}")]
    Overloaded(String),

    #[error("CV generation failed: {0}")]
    CvGeneration(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        let message = err.public_message().to_string();
        if err.is_not_found() {
            AppError::NotFound(message)
        } else if err.is_overloaded() {
            AppError::Overloaded(message)
        } else {
            AppError::CvGeneration(message)
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
            ),
            AppError::Overloaded(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "OVERLOADED", msg.clone())
            }
            AppError::CvGeneration(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CV_GENERATION_FAILED",
                msg.clone(),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    GENERIC_FAILURE.to_string(),
                )
            }
        };

        let body = Json(json!({
            "success": false,
            "error": message,
            "code": code
        }));

        (status, body).into_response()
    }
}
