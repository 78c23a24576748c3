/// Unified error types for the loyalty points backend
use axum::{
    extract::rejection::JsonRejection,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum PointsError {
    /// Missing or malformed input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown account or record
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing, invalid or expired credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Account exists but is deactivated
    #[error("Account inactive: {0}")]
    Forbidden(String),

    /// No promo code with that text
    #[error("Invalid code")]
    InvalidCode,

    #[error("Code has been deactivated")]
    CodeInactive,

    #[error("Code has expired")]
    CodeExpired,

    /// Global usage limit reached
    #[error("Code has no uses remaining")]
    CodeExhausted,

    /// This account already redeemed the code
    #[error("You have already used this code")]
    AlreadyRedeemed,

    #[error("Insufficient points: balance {balance}, required {required}")]
    InsufficientPoints { balance: i64, required: i64 },

    /// Registration conflicts (email, username, national id)
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: std::time::Duration },

    /// Transaction or query failure
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PointsError {
    /// Stable machine-readable error code used in response bodies
    pub fn code(&self) -> &'static str {
        match self {
            PointsError::Validation(_) => "InvalidRequest",
            PointsError::NotFound(_) => "NotFound",
            PointsError::Authentication(_) => "AuthenticationRequired",
            PointsError::Forbidden(_) => "AccountInactive",
            PointsError::InvalidCode => "InvalidCode",
            PointsError::CodeInactive => "CodeInactive",
            PointsError::CodeExpired => "CodeExpired",
            PointsError::CodeExhausted => "CodeExhausted",
            PointsError::AlreadyRedeemed => "AlreadyRedeemed",
            PointsError::InsufficientPoints { .. } => "InsufficientPoints",
            PointsError::DuplicateKey(_) => "DuplicateKey",
            PointsError::RateLimitExceeded { .. } => "RateLimitExceeded",
            PointsError::Storage(_)
            | PointsError::Migration(_)
            | PointsError::Io(_)
            | PointsError::Internal(_) => "InternalServerError",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            PointsError::Validation(_)
            | PointsError::InvalidCode
            | PointsError::CodeInactive
            | PointsError::CodeExpired
            | PointsError::CodeExhausted
            | PointsError::AlreadyRedeemed
            | PointsError::InsufficientPoints { .. }
            | PointsError::DuplicateKey(_) => StatusCode::BAD_REQUEST,
            PointsError::NotFound(_) => StatusCode::NOT_FOUND,
            PointsError::Authentication(_) | PointsError::Forbidden(_) => StatusCode::UNAUTHORIZED,
            PointsError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            PointsError::Storage(_)
            | PointsError::Migration(_)
            | PointsError::Io(_)
            | PointsError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True when the error originates from a unique index violation
    pub fn is_unique_violation(&self) -> bool {
        match self {
            PointsError::Storage(sqlx::Error::Database(e)) => e.is_unique_violation(),
            _ => false,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert PointsError to HTTP response
impl IntoResponse for PointsError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request failed: {}", self);
            "Internal server error".to_string() // Don't leak details
        } else {
            self.to_string()
        };

        let body = Json(ErrorResponse {
            error: self.code().to_string(),
            message,
        });

        if let PointsError::RateLimitExceeded { retry_after } = self {
            let seconds = retry_after.as_secs().max(1).to_string();
            return (status, [(header::RETRY_AFTER, seconds)], body).into_response();
        }

        (status, body).into_response()
    }
}

/// Malformed or mistyped JSON bodies are validation failures
impl From<JsonRejection> for PointsError {
    fn from(rejection: JsonRejection) -> Self {
        PointsError::Validation(rejection.body_text())
    }
}

/// Result type alias for service operations
pub type PointsResult<T> = Result<T, PointsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_errors_are_bad_request() {
        for err in [
            PointsError::InvalidCode,
            PointsError::CodeInactive,
            PointsError::CodeExpired,
            PointsError::CodeExhausted,
            PointsError::AlreadyRedeemed,
            PointsError::InsufficientPoints { balance: 1, required: 2 },
            PointsError::DuplicateKey("email".to_string()),
        ] {
            assert_eq!(err.status(), StatusCode::BAD_REQUEST, "{}", err.code());
        }
    }

    #[test]
    fn test_inactive_account_is_unauthorized() {
        let err = PointsError::Forbidden("deactivated".to_string());
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.code(), "AccountInactive");
    }

    #[test]
    fn test_storage_errors_hide_details() {
        let response = PointsError::Storage(sqlx::Error::RowNotFound).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_rate_limit_sets_retry_after() {
        let response = PointsError::RateLimitExceeded {
            retry_after: std::time::Duration::from_secs(3),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "3");
    }

    #[test]
    fn test_code_messages_are_distinct() {
        let messages: std::collections::HashSet<String> = [
            PointsError::InvalidCode,
            PointsError::CodeInactive,
            PointsError::CodeExpired,
            PointsError::CodeExhausted,
            PointsError::AlreadyRedeemed,
        ]
        .iter()
        .map(|e| e.to_string())
        .collect();
        assert_eq!(messages.len(), 5);
    }
}
