/// Unified error types for the Gatherly service
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Authorization errors
    #[error("Not authorized: {0}")]
    Forbidden(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Business-rule rejections (full event, already resolved report, inactive event)
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Concurrent-mutation race lost; safe to retry
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage timeout or overload; safe to retry
    #[error("Transient failure: {0}")]
    Transient(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: std::time::Duration },

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Wire error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert ServiceError to HTTP response
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ServiceError::Forbidden(_) => {
                (StatusCode::FORBIDDEN, "Forbidden", self.to_string())
            }
            ServiceError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "InvalidRequest", self.to_string())
            }
            ServiceError::NotFound(_) => {
                (StatusCode::NOT_FOUND, "NotFound", self.to_string())
            }
            ServiceError::InvalidState(_) => {
                (StatusCode::CONFLICT, "InvalidState", self.to_string())
            }
            ServiceError::Conflict(_) => {
                (StatusCode::CONFLICT, "Conflict", self.to_string())
            }
            ServiceError::Transient(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Transient",
                self.to_string(),
            ),
            ServiceError::RateLimitExceeded { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RateLimitExceeded",
                "Rate limit exceeded".to_string(),
            ),
            // Pool exhaustion is retryable; surface it as such
            ServiceError::Database(sqlx::Error::PoolTimedOut) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Transient",
                "Storage temporarily unavailable".to_string(),
            ),
            ServiceError::Database(_) | ServiceError::Internal(_) | ServiceError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                "Internal server error".to_string(), // Don't leak details
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                ServiceError::NotFound("event".into()).into_response(),
                StatusCode::NOT_FOUND,
            ),
            (
                ServiceError::Forbidden("moderator role required".into()).into_response(),
                StatusCode::FORBIDDEN,
            ),
            (
                ServiceError::InvalidState("event is full".into()).into_response(),
                StatusCode::CONFLICT,
            ),
            (
                ServiceError::Conflict("lost update race".into()).into_response(),
                StatusCode::CONFLICT,
            ),
            (
                ServiceError::Transient("storage busy".into()).into_response(),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ServiceError::Validation("title too short".into()).into_response(),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (response, expected) in cases {
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_internal_errors_do_not_leak() {
        let response = ServiceError::Internal("secret pool path".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_pool_timeout_is_transient() {
        let response = ServiceError::Database(sqlx::Error::PoolTimedOut).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
