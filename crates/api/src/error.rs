//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use order_store::StoreError;
use pipeline::PipelineError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// The request conflicts with current order state.
    Conflict(String),
    /// A downstream dependency is unavailable; the caller should retry.
    Unavailable(String),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Unavailable(msg) => {
                tracing::warn!(error = %msg, "dependency unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, msg)
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match &err {
            PipelineError::OrderNotFound(_) => ApiError::NotFound(err.to_string()),
            PipelineError::Invalid(_) => ApiError::BadRequest(err.to_string()),
            PipelineError::UnknownProviderStatus(_) => ApiError::BadRequest(err.to_string()),
            // A 503 tells the webhook source to redeliver the event.
            PipelineError::ProviderUnavailable(_) => ApiError::Unavailable(err.to_string()),
            PipelineError::Store(store_err) => store_error_to_api(store_err, &err),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        store_error_to_api(&err, &err)
    }
}

fn store_error_to_api(err: &StoreError, display: &dyn std::fmt::Display) -> ApiError {
    match err {
        StoreError::NotFound(_) => ApiError::NotFound(display.to_string()),
        StoreError::DuplicateOrder(_)
        | StoreError::Rejected(_)
        | StoreError::VersionConflict { .. } => ApiError::Conflict(display.to_string()),
        StoreError::Database(_) | StoreError::Serialization(_) => {
            ApiError::Internal(display.to_string())
        }
    }
}
