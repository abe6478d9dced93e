//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how each
//! failure is rendered to clients.

use crate::config::ConfigError;
use axum::{
    extract::rejection::{FormRejection, QueryRejection},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use posh_training_core::{PortError, TrainingError};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents a rejected or failed core operation.
    #[error(transparent)]
    Training(#[from] TrainingError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents an error while applying the embedded migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The request itself was malformed (missing or blank fields).
    #[error("{0}")]
    BadRequest(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl From<PortError> for ApiError {
    fn from(e: PortError) -> Self {
        Self::Training(TrainingError::Port(e))
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// The uniform body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: bool,
    pub error_code: String,
    pub message: String,
    pub details: String,
    pub suggestions: Vec<String>,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str, &'static str) {
        match self {
            Self::Training(e) => match e {
                TrainingError::InvalidEmail(_) => {
                    (StatusCode::BAD_REQUEST, "INVALID_EMAIL_FORMAT", "Invalid Email Format")
                }
                TrainingError::NotAuthorized(_) => {
                    (StatusCode::FORBIDDEN, "EMAIL_NOT_AUTHORIZED", "Access Denied")
                }
                TrainingError::NotAuthenticated => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Unauthorized Access")
                }
                TrainingError::UserNotFound(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", "Resource Not Found")
                }
                TrainingError::NoOpenVisit(_) => {
                    (StatusCode::CONFLICT, "NO_OPEN_VISIT", "Slide Not Started")
                }
                TrainingError::InvalidOrdering { .. } => {
                    (StatusCode::CONFLICT, "INVALID_ORDERING", "Invalid Slide Timing")
                }
                TrainingError::InvalidScore { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_SCORE", "Invalid Quiz Score")
                }
                TrainingError::InvalidLimit(_) => {
                    (StatusCode::BAD_REQUEST, "INVALID_LIMIT", "Invalid Leaderboard Limit")
                }
                TrainingError::Port(port) if port.is_retryable() => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "STORE_UNAVAILABLE",
                    "Service Temporarily Unavailable",
                ),
                TrainingError::Port(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", "Internal Error")
                }
            },
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", "Bad Request"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", "Internal Error"),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        let hints: &[&str] = match self {
            Self::Training(TrainingError::InvalidEmail(_)) => &[
                "Please enter a valid email address (e.g., user@example.com)",
                "Check for typos in your email address",
            ],
            Self::Training(TrainingError::NotAuthorized(_)) => &[
                "Please check if you entered the correct email address",
                "Contact your HR department or training administrator",
                "Ensure you are using your official company email",
            ],
            Self::Training(TrainingError::NotAuthenticated) => &[
                "Ensure you are logged in with a valid token",
                "Your session may have expired - please login again",
                "Check that the Authorization header is properly set",
            ],
            Self::Training(TrainingError::NoOpenVisit(_)) => &["Start the slide before ending it"],
            Self::Training(e) if e.is_retryable() => &["Retry the request in a few seconds"],
            _ => &[],
        };
        hints.iter().map(|s| s.to_string()).collect()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.status_and_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        // Internal details stay in the logs.
        let details = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "An unexpected error occurred".to_string()
        } else {
            self.to_string()
        };
        let body = ErrorBody {
            error: true,
            error_code: code.to_string(),
            message: message.to_string(),
            details,
            suggestions: self.suggestions(),
        };

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use posh_training_core::SlideId;

    fn status_of(e: TrainingError) -> StatusCode {
        ApiError::from(e).into_response().status()
    }

    #[test]
    fn client_errors_map_to_4xx() {
        assert_eq!(status_of(TrainingError::InvalidEmail("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(TrainingError::NotAuthorized("a@b.co".into())), StatusCode::FORBIDDEN);
        assert_eq!(status_of(TrainingError::UserNotFound("a@b.co".into())), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(TrainingError::NoOpenVisit(SlideId::new("2").unwrap())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(TrainingError::InvalidScore { score: 11, max_score: 10 }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(status_of(TrainingError::InvalidLimit(0)), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unauthenticated_carries_bearer_challenge() {
        let response = ApiError::from(TrainingError::NotAuthenticated).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }

    #[test]
    fn transient_store_failures_are_503() {
        assert_eq!(
            ApiError::from(PortError::Timeout(5000)).into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(PortError::Unexpected("boom".into())).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
