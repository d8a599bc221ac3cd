//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ragline_infra::{QueueError, StoreError};

use crate::service::job_service::JobError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    StoreError(StoreError),
    QueueError(QueueError),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::StoreError(err) => {
                tracing::error!("Status store error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::QueueError(err) => {
                tracing::error!("Job queue error: {}", err);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Job queue unavailable".to_string(),
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::NotFound(_) => ApiError::NotFound("Job ID not found.".to_string()),
            JobError::Validation(e) => ApiError::BadRequest(e.to_string()),
            JobError::Encode(e) => ApiError::InternalError(e.to_string()),
            JobError::Store(e) => ApiError::StoreError(e),
            JobError::Queue(e) => ApiError::QueueError(e),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
