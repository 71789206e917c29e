/// Unified error types for the SpeedPay ledger service
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::minter::IdSpace;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum BankError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration errors
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Generic lookup failure for a named record
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Account {0} does not exist")]
    UnknownAccount(i64),

    #[error("User {0} does not exist")]
    UnknownUser(String),

    #[error("Invalid OTP")]
    InvalidOtp,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Account {0} has no app user, please register")]
    UnregisteredAppUser(i64),

    /// Generic validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Amount must be greater than zero, got {0}")]
    InvalidAmount(rust_decimal::Decimal),

    #[error("Insufficient funds in account {account}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account: i64,
        balance: rust_decimal::Decimal,
        requested: rust_decimal::Decimal,
    },

    #[error("Account {0} is restricted, please visit the bank")]
    AccountRestricted(i64),

    #[error("Cannot transfer from account {0} to itself")]
    SameAccountTransfer(i64),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Account {0} is not verified, verify it or visit the bank")]
    NotVerified(i64),

    /// Authorization errors
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Conflict errors (e.g., duplicate username)
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Account {0} already has an app user")]
    AccountAlreadyRegistered(i64),

    #[error("Account {0} is already verified")]
    AccountAlreadyVerified(i64),

    #[error("No free identifier found in {0:?} space")]
    IdentifierSpaceExhausted(IdSpace),

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// JWT errors
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification used by callers that only care about the family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Authentication,
    Conflict,
    Exhaustion,
    Internal,
}

impl BankError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BankError::NotFound(_)
            | BankError::UnknownAccount(_)
            | BankError::UnknownUser(_)
            | BankError::InvalidOtp
            | BankError::InvalidToken
            | BankError::UnregisteredAppUser(_) => ErrorKind::NotFound,
            BankError::Validation(_)
            | BankError::InvalidAmount(_)
            | BankError::InsufficientFunds { .. }
            | BankError::AccountRestricted(_)
            | BankError::SameAccountTransfer(_) => ErrorKind::Validation,
            BankError::Authentication(_)
            | BankError::InvalidPassword
            | BankError::NotVerified(_)
            | BankError::Authorization(_)
            | BankError::RateLimitExceeded => ErrorKind::Authentication,
            BankError::Conflict(_)
            | BankError::AccountAlreadyRegistered(_)
            | BankError::AccountAlreadyVerified(_) => ErrorKind::Conflict,
            BankError::IdentifierSpaceExhausted(_) => ErrorKind::Exhaustion,
            BankError::Database(_)
            | BankError::Migration(_)
            | BankError::Jwt(_)
            | BankError::Io(_)
            | BankError::Internal(_) => ErrorKind::Internal,
        }
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            BankError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            BankError::UnknownAccount(_) => (StatusCode::NOT_FOUND, "UnknownAccount"),
            BankError::UnknownUser(_) => (StatusCode::NOT_FOUND, "UnknownUser"),
            BankError::InvalidOtp => (StatusCode::NOT_FOUND, "InvalidOTP"),
            BankError::InvalidToken => (StatusCode::NOT_FOUND, "InvalidToken"),
            BankError::UnregisteredAppUser(_) => (StatusCode::NOT_FOUND, "UnregisteredAppUser"),
            BankError::Validation(_) => (StatusCode::BAD_REQUEST, "InvalidRequest"),
            BankError::InvalidAmount(_) => (StatusCode::BAD_REQUEST, "InvalidAmount"),
            BankError::InsufficientFunds { .. } => (StatusCode::BAD_REQUEST, "InsufficientFunds"),
            BankError::AccountRestricted(_) => (StatusCode::BAD_REQUEST, "AccountRestricted"),
            BankError::SameAccountTransfer(_) => (StatusCode::BAD_REQUEST, "SameAccountTransfer"),
            BankError::Authentication(_) => (StatusCode::UNAUTHORIZED, "AuthenticationRequired"),
            BankError::InvalidPassword => (StatusCode::UNAUTHORIZED, "InvalidPassword"),
            BankError::NotVerified(_) => (StatusCode::UNAUTHORIZED, "NotVerified"),
            BankError::Authorization(_) => (StatusCode::FORBIDDEN, "Forbidden"),
            BankError::Conflict(_) => (StatusCode::CONFLICT, "Conflict"),
            BankError::AccountAlreadyRegistered(_) => {
                (StatusCode::CONFLICT, "AccountAlreadyRegistered")
            }
            BankError::AccountAlreadyVerified(_) => {
                (StatusCode::NOT_ACCEPTABLE, "AccountAlreadyVerified")
            }
            BankError::IdentifierSpaceExhausted(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "IdentifierSpaceExhausted")
            }
            BankError::RateLimitExceeded => (StatusCode::TOO_MANY_REQUESTS, "RateLimitExceeded"),
            BankError::Database(_)
            | BankError::Migration(_)
            | BankError::Jwt(_)
            | BankError::Io(_)
            | BankError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "InternalServerError")
            }
        }
    }
}

/// JSON error body returned to clients
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert BankError to HTTP response
impl IntoResponse for BankError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();

        let message = if self.kind() == ErrorKind::Internal {
            tracing::error!("request failed: {}", self);
            // Don't leak details
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for service operations
pub type BankResult<T> = Result<T, BankError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case::unknown_account(BankError::UnknownAccount(20000000001), StatusCode::NOT_FOUND)]
    #[case::invalid_otp(BankError::InvalidOtp, StatusCode::NOT_FOUND)]
    #[case::invalid_token(BankError::InvalidToken, StatusCode::NOT_FOUND)]
    #[case::insufficient(
        BankError::InsufficientFunds { account: 1, balance: dec!(40.00), requested: dec!(50.00) },
        StatusCode::BAD_REQUEST
    )]
    #[case::not_verified(BankError::NotVerified(1), StatusCode::UNAUTHORIZED)]
    #[case::bad_password(BankError::InvalidPassword, StatusCode::UNAUTHORIZED)]
    #[case::already_verified(BankError::AccountAlreadyVerified(1), StatusCode::NOT_ACCEPTABLE)]
    #[case::already_registered(BankError::AccountAlreadyRegistered(1), StatusCode::CONFLICT)]
    #[case::exhausted(
        BankError::IdentifierSpaceExhausted(IdSpace::Otp),
        StatusCode::SERVICE_UNAVAILABLE
    )]
    fn test_status_mapping(#[case] error: BankError, #[case] expected: StatusCode) {
        assert_eq!(error.into_response().status(), expected);
    }

    #[rstest]
    #[case::same_account(BankError::SameAccountTransfer(7), ErrorKind::Validation)]
    #[case::restricted(BankError::AccountRestricted(7), ErrorKind::Validation)]
    #[case::unknown_user(BankError::UnknownUser("bob".into()), ErrorKind::NotFound)]
    #[case::already_verified(BankError::AccountAlreadyVerified(7), ErrorKind::Conflict)]
    #[case::exhausted(BankError::IdentifierSpaceExhausted(IdSpace::Hex128), ErrorKind::Exhaustion)]
    fn test_error_kind(#[case] error: BankError, #[case] expected: ErrorKind) {
        assert_eq!(error.kind(), expected);
    }

    #[test]
    fn test_insufficient_funds_message() {
        let err = BankError::InsufficientFunds {
            account: 20000000001,
            balance: dec!(40.00),
            requested: dec!(50.00),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds in account 20000000001: balance 40.00, requested 50.00"
        );
    }
}
