/// Unified error types for the booking backend
use crate::db::models::AccountStatus;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for API operations
#[derive(Error, Debug)]
pub enum ApiError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Malformed input, rejected before reaching business logic
    #[error("Validation error: {0}")]
    Validation(String),

    /// Wrong email/password. Deliberately indistinguishable from
    /// "account not found" so callers cannot enumerate accounts.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Patient accounts must use the one-time-code flow
    #[error("This account must sign in with a verification code")]
    WrongAuthMethod,

    /// Reached only after credentials are proven correct, so revealing
    /// the status is acceptable here.
    #[error("Account is {}", .0.as_str())]
    AccountSuspended(AccountStatus),

    /// Clinician account without a profile row. Internal inconsistency,
    /// surfaced to the client as a generic server error.
    #[error("Clinician profile missing for account {0}")]
    ProfileMissing(String),

    /// Clinician credentials are correct but the profile review is pending
    #[error("Clinician profile is pending validation")]
    ValidationPending,

    /// Clinician profile was rejected during review
    #[error("Clinician profile was rejected")]
    ValidationRejected(Option<String>),

    /// No unconsumed code matches the submitted phone + code pair
    #[error("Invalid verification code")]
    OtpInvalid,

    /// The right code was submitted, but too late
    #[error("Verification code has expired")]
    OtpExpired,

    /// Missing or invalid bearer credential on a protected route
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Unparsable token TTL specification. Fatal configuration error,
    /// never a per-request failure.
    #[error("Invalid duration spec: {0}")]
    InvalidDurationSpec(String),

    /// Token signing/verification errors
    #[error("Token error: {0}")]
    Jwt(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict errors (e.g. duplicate phone number)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Client-facing error body with a stable machine-readable code
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            ApiError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", self.to_string())
            }
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                self.to_string(),
            ),
            ApiError::WrongAuthMethod => (
                StatusCode::FORBIDDEN,
                "WRONG_AUTH_METHOD",
                self.to_string(),
            ),
            ApiError::AccountSuspended(_) => (
                StatusCode::FORBIDDEN,
                "ACCOUNT_SUSPENDED",
                self.to_string(),
            ),
            ApiError::ValidationPending => (
                StatusCode::FORBIDDEN,
                "VALIDATION_PENDING",
                self.to_string(),
            ),
            ApiError::ValidationRejected(reason) => (
                StatusCode::FORBIDDEN,
                "VALIDATION_REJECTED",
                reason
                    .clone()
                    .unwrap_or_else(|| "Clinician profile was rejected".to_string()),
            ),
            ApiError::OtpInvalid => {
                (StatusCode::UNAUTHORIZED, "OTP_INVALID", self.to_string())
            }
            ApiError::OtpExpired => {
                (StatusCode::UNAUTHORIZED, "OTP_EXPIRED", self.to_string())
            }
            ApiError::Authentication(_) => (
                StatusCode::UNAUTHORIZED,
                "AUTHENTICATION_REQUIRED",
                self.to_string(),
            ),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string()),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT", self.to_string()),
            // Don't leak internal detail
            ApiError::Database(_)
            | ApiError::ProfileMissing(_)
            | ApiError::InvalidDurationSpec(_)
            | ApiError::Jwt(_)
            | ApiError::Internal(_)
            | ApiError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "Internal server error".to_string(),
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;
