//! HTTP error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{
    domain::ValidationError,
    usecase::{
        BookingEventError, ChatError, ErrorKind, LiveSessionError, NotifyError, RoomAccessError,
    },
};

/// Error type returned by the REST handlers.
///
/// Use-case errors keep their [`ErrorKind`], which decides the status code.
/// The body is always `{"success": false, "error": <message>, "code": <CODE>}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    UseCase { kind: ErrorKind, message: String },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Status code and machine-readable code for an error class.
pub fn classify(kind: ErrorKind) -> (StatusCode, &'static str) {
    match kind {
        ErrorKind::Validation => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        ErrorKind::Unauthenticated => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
        ErrorKind::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
        ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        ErrorKind::Conflict => (StatusCode::CONFLICT, "CONFLICT"),
        ErrorKind::Policy => (StatusCode::UNPROCESSABLE_ENTITY, "POLICY_VIOLATION"),
        ErrorKind::Store => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::UseCase {
                kind: ErrorKind::Store,
                message,
            } => {
                tracing::error!(error = %message, "Store failure while handling request");
                let (status, code) = classify(ErrorKind::Store);
                (status, code, "An internal error occurred".to_string())
            }
            ApiError::UseCase { kind, message } => {
                let (status, code) = classify(kind);
                (status, code, message)
            }
            ApiError::Unauthorized(message) => {
                let (status, code) = classify(ErrorKind::Unauthenticated);
                (status, code, message)
            }
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", message),
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "success": false,
            "error": message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}

macro_rules! from_usecase_error {
    ($($error:ty),* $(,)?) => {
        $(
            impl From<$error> for ApiError {
                fn from(err: $error) -> Self {
                    ApiError::UseCase {
                        kind: err.kind(),
                        message: err.to_string(),
                    }
                }
            }
        )*
    };
}

from_usecase_error!(
    ChatError,
    LiveSessionError,
    NotifyError,
    RoomAccessError,
    BookingEventError,
);

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::UseCase {
            kind: ErrorKind::Validation,
            message: err.to_string(),
        }
    }
}
