//! HTTP error types for the `CipherSafe` server.
//!
//! Maps domain errors from `ciphersafe-core` into HTTP responses. Every
//! error produces a JSON body with a machine-readable `error` field and a
//! human-readable `message`. Internal failures are logged and their detail
//! withheld from the client.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use ciphersafe_core::ServiceError;

/// Application-level error returned from HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Client sent invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing, invalid or expired credentials.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// Authenticated, but not permitted to touch the resource.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Resource already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal error (storage, crypto, signing).
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error".to_owned(),
                )
            }
        };

        let body = ErrorBody {
            error: error_type,
            message,
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(msg) => Self::BadRequest(msg),
            ServiceError::Unauthenticated(msg) => Self::Unauthenticated(msg),
            ServiceError::Unauthorized(msg) => Self::Forbidden(msg),
            ServiceError::NotFound(msg) => Self::NotFound(msg),
            ServiceError::Conflict(msg) => Self::Conflict(msg),
            ServiceError::AuthenticationFailure(msg) | ServiceError::Internal(msg) => {
                Self::Internal(msg)
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ServiceError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn service_errors_map_to_statuses() {
        let s = String::new;
        assert_eq!(status_of(ServiceError::Validation(s())), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(ServiceError::Unauthenticated(s())), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(ServiceError::Unauthorized(s())), StatusCode::FORBIDDEN);
        assert_eq!(status_of(ServiceError::NotFound(s())), StatusCode::NOT_FOUND);
        assert_eq!(status_of(ServiceError::Conflict(s())), StatusCode::CONFLICT);
        assert_eq!(
            status_of(ServiceError::AuthenticationFailure(s())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(ServiceError::Internal(s())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
