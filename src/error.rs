//! Error handling module
//!
//! Centralized error types and HTTP response conversion. Every variant maps
//! to a stable machine-readable code so clients can branch without parsing
//! message text.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    InvalidAmount(#[from] crate::domain::AmountError),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email not verified")]
    EmailNotVerified,

    #[error("Account blocked")]
    AccountBlocked,

    #[error("Invalid verification token: {0}")]
    InvalidVerificationToken(String),

    #[error("Sender not found")]
    SenderNotFound,

    #[error("Recipient not found")]
    RecipientNotFound,

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Transaction not found")]
    TransactionNotFound,

    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("An account with this email already exists")]
    DuplicateEmail,

    // Server errors (5xx)
    #[error("Credit failed")]
    CreditFailed,

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Validation(_) | AppError::InvalidAmount(_) => "VALIDATION_ERROR",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::EmailNotVerified => "EMAIL_NOT_VERIFIED",
            AppError::AccountBlocked => "ACCOUNT_BLOCKED",
            AppError::InvalidVerificationToken(_) => "INVALID_TOKEN",
            AppError::SenderNotFound => "SENDER_NOT_FOUND",
            AppError::RecipientNotFound => "RECIPIENT_NOT_FOUND",
            AppError::UserNotFound(_) => "USER_NOT_FOUND",
            AppError::TransactionNotFound => "NOT_FOUND",
            AppError::InsufficientFunds => "INSUFFICIENT_FUNDS",
            AppError::DuplicateEmail => "DUPLICATE_EMAIL",
            AppError::CreditFailed => "CREDIT_FAILED",
            AppError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// HTTP status this error maps to
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::InvalidVerificationToken(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Validation(_) | AppError::InvalidAmount(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Unauthorized | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::EmailNotVerified | AppError::AccountBlocked => StatusCode::FORBIDDEN,
            AppError::SenderNotFound
            | AppError::RecipientNotFound
            | AppError::UserNotFound(_)
            | AppError::TransactionNotFound => StatusCode::NOT_FOUND,
            AppError::InsufficientFunds | AppError::DuplicateEmail => StatusCode::CONFLICT,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::CreditFailed
            | AppError::Database(_)
            | AppError::Internal(_)
            | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let details = match &self {
            AppError::BadRequest(msg) | AppError::Validation(msg) => Some(msg.clone()),
            AppError::InvalidAmount(e) => Some(e.to_string()),
            AppError::InvalidVerificationToken(msg) => Some(msg.clone()),
            AppError::UserNotFound(id) => Some(id.clone()),
            _ => None,
        };

        // Server-side faults are logged here so they are never silently
        // swallowed on the way out.
        match &self {
            AppError::CreditFailed => {
                tracing::error!("Credit step failed after successful debit guard");
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
            }
            AppError::StoreUnavailable(reason) => {
                tracing::warn!("Store unavailable: {}", reason);
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
            }
            _ => {}
        }

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: self.code().to_string(),
            details,
        };

        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_error_codes_are_stable() {
        assert_eq!(AppError::SenderNotFound.code(), "SENDER_NOT_FOUND");
        assert_eq!(AppError::RecipientNotFound.code(), "RECIPIENT_NOT_FOUND");
        assert_eq!(AppError::InsufficientFunds.code(), "INSUFFICIENT_FUNDS");
        assert_eq!(AppError::CreditFailed.code(), "CREDIT_FAILED");
        assert_eq!(
            AppError::StoreUnavailable("pool timed out".into()).code(),
            "STORE_UNAVAILABLE"
        );
        assert_eq!(
            AppError::Validation("amount must be > 0".into()).code(),
            "VALIDATION_ERROR"
        );
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::InsufficientFunds.status(), StatusCode::CONFLICT);
        assert_eq!(AppError::SenderNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Validation("bad".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::StoreUnavailable("down".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(AppError::DuplicateEmail.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_conflict_distinct_from_not_found() {
        // Clients branch on code, so the two caller-fault families must not
        // collapse into one.
        assert_ne!(
            AppError::InsufficientFunds.code(),
            AppError::RecipientNotFound.code()
        );
    }
}
