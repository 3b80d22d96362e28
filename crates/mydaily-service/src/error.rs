//! Error types for the pipeline and API responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use mydaily_core::UserId;
use mydaily_store::StoreError;

/// Errors raised inside the notification pipeline.
///
/// These never escape the trigger entry points; they are logged there.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The activating user's profile does not exist.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound(format!("{entity} not found: {id}")),
            StoreError::Conflict { key } => Self::Internal(format!("unresolved write conflict on {key}")),
            StoreError::Database(msg) | StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}

impl From<mydaily_core::DomainError> for ApiError {
    fn from(err: mydaily_core::DomainError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<mydaily_core::IdError> for ApiError {
    fn from(err: mydaily_core::IdError) -> Self {
        Self::BadRequest(format!("invalid user id: {err}"))
    }
}
