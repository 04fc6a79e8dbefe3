//! Error types for the wellrev-review HTTP API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::workflow::WorkflowError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Workflow refused or failed the operation
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Workflow(err) => match err {
                WorkflowError::Busy => (StatusCode::CONFLICT, "BUSY"),
                WorkflowError::Rejected(_) => (StatusCode::CONFLICT, "REJECTED"),
                WorkflowError::NotCompleted(_) => (StatusCode::CONFLICT, "NOT_COMPLETED"),
                WorkflowError::NoDataset => (StatusCode::CONFLICT, "NO_DATASET"),
                WorkflowError::Superseded => (StatusCode::CONFLICT, "SUPERSEDED"),
                WorkflowError::Upload(_) => (StatusCode::BAD_GATEWAY, "UPLOAD_FAILED"),
                WorkflowError::Fetch(_) => (StatusCode::BAD_GATEWAY, "SERVICE_ERROR"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.parts();

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
