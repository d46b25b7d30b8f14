/// Error handling for the API server
///
/// A unified error type that maps to HTTP responses. All handlers return
/// `Result<T, ApiError>` which converts to the wire envelope
/// `{ "errors": ["...", ...] }` with the appropriate status code.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

use wayfarer_shared::auth::password::PasswordError;
use wayfarer_shared::profile::MachineError;
use wayfarer_shared::store::StoreError;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Unauthorized (401)
    Unauthorized(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409) - a profile run is already in flight
    Conflict(String),

    /// Unprocessable entity (422) - validation errors
    Validation(Vec<String>),

    /// Internal server error (500)
    Internal(String),
}

/// Error response format
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error messages
    pub errors: Vec<String>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            ApiError::NotFound(msg) => write!(f, "Not found: {msg}"),
            ApiError::Conflict(msg) => write!(f, "Conflict: {msg}"),
            ApiError::Validation(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, errors) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, vec![msg]),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, vec![msg]),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, vec![msg]),
            ApiError::Validation(errors) => (StatusCode::UNPROCESSABLE_ENTITY, errors),
            ApiError::Internal(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    vec!["Internal server error".to_string()],
                )
            }
        };

        (status, Json(ErrorResponse { errors })).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail(_) => {
                ApiError::Validation(vec!["Email has already been taken".to_string()])
            }
            StoreError::Backend(err) => ApiError::Internal(format!("Store error: {err}")),
        }
    }
}

impl From<MachineError> for ApiError {
    fn from(err: MachineError) -> Self {
        match err {
            MachineError::AccountMissing(_) => ApiError::NotFound("Account not found".to_string()),
            MachineError::Store(err) => err.into(),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(format!("Password operation failed: {err}"))
    }
}
