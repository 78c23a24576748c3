/// Account management system
///
/// Handles registration, login, password hashing and bearer tokens.

mod manager;

pub use manager::AccountManager;

use crate::db::account::Account;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Registration request
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RegisterRequest {
    /// Defaults to the email when absent
    pub username: Option<String>,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(length(min = 1, message = "full_name is required"))]
    pub full_name: String,
    #[validate(length(min = 1, message = "national_id is required"))]
    pub national_id: String,
    #[validate(length(min = 1, message = "address is required"))]
    pub address: String,
    /// `YYYY-MM-DD`
    #[validate(length(min = 1, message = "birth_date is required"))]
    pub birth_date: String,
}

/// Login request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token verification request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyTokenRequest {
    pub token: String,
}

/// Registration and login response
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub account: Account,
}

/// Token verification response
#[derive(Debug, Clone, Serialize)]
pub struct VerifyTokenResponse {
    pub valid: bool,
    pub account: Account,
}

/// Claims carried by the bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Account id
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Validated bearer token
#[derive(Debug, Clone)]
pub struct ValidatedSession {
    pub account_id: i64,
}
