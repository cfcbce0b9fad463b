use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::services::RegistrationError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Duplicate email: {0}")]
    DuplicateEmail(String),

    #[error("Registration closed: {0}")]
    RegistrationClosed(String),

    #[error("Capacity reached: {0}")]
    CapacityReached(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: &'static str,
    message: String,
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg.clone()),
            ApiError::InvalidStatus(msg) => (StatusCode::BAD_REQUEST, "invalid_status", msg.clone()),
            ApiError::DuplicateEmail(msg) => (StatusCode::CONFLICT, "duplicate_email", msg.clone()),
            ApiError::RegistrationClosed(msg) => {
                (StatusCode::FORBIDDEN, "registration_closed", msg.clone())
            }
            ApiError::CapacityReached(msg) => {
                (StatusCode::CONFLICT, "capacity_reached", msg.clone())
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            ApiError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                "Too many registration attempts. Please try again later.".into(),
            ),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".into(),
                )
            }
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg.clone(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = self.parts();
        let body = ErrorBody {
            success: false,
            error,
            message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<RegistrationError> for ApiError {
    fn from(err: RegistrationError) -> Self {
        let message = err.to_string();
        match err {
            RegistrationError::Validation(_) | RegistrationError::InvalidDay(_) => {
                ApiError::Validation(message)
            }
            RegistrationError::InvalidStatus { .. } => ApiError::InvalidStatus(message),
            RegistrationError::DuplicateEmail => ApiError::DuplicateEmail(message),
            RegistrationError::RegistrationClosed => ApiError::RegistrationClosed(message),
            RegistrationError::CapacityReached(_) => ApiError::CapacityReached(message),
            RegistrationError::NotFound => ApiError::NotFound(message),
            RegistrationError::Store(detail) => ApiError::Internal(detail),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Internal(format!("Database error: {}", err))
    }
}
