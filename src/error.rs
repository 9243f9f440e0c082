use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::PoisonError;
use thiserror::Error;

use crate::validation::auth::ValidationError;

/// Which unique identifier collided when creating an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Email,
    Username,
}

impl std::fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentifierKind::Email => f.write_str("email"),
            IdentifierKind::Username => f.write_str("username"),
        }
    }
}

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Signup or password-change input was rejected.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The email is already registered.
    #[error("Email already registered")]
    EmailTaken,

    /// The username is already registered.
    #[error("Username already taken")]
    UsernameTaken,

    /// A store-level uniqueness violation.
    #[error("Duplicate {0}")]
    DuplicateIdentifier(IdentifierKind),

    /// Unknown account or wrong password. Both cases share this variant.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// No current session.
    #[error("Not authenticated")]
    Unauthorized,

    /// A record was not found in a store.
    #[error("Resource not found")]
    NotFound,

    /// An I/O error from the storage backend.
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Stored JSON could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] sonic_rs::Error),

    /// The statistics endpoint could not be reached or decoded.
    #[error("Statistics error: {0}")]
    Statistics(#[from] reqwest::Error),

    /// A credential digest error.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// An internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl<T> From<PoisonError<T>> for AppError {
    fn from(_: PoisonError<T>) -> Self {
        AppError::Internal("store lock poisoned".to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Validation(ref e) => {
                tracing::debug!("Validation error: {}", e);
                (StatusCode::BAD_REQUEST, e.to_string())
            }

            AppError::EmailTaken | AppError::UsernameTaken | AppError::DuplicateIdentifier(_) => {
                tracing::debug!("Conflict: {}", self);
                (StatusCode::CONFLICT, self.to_string())
            }

            AppError::InvalidCredentials => {
                tracing::warn!("Authentication failed");
                (StatusCode::UNAUTHORIZED, self.to_string())
            }

            AppError::Unauthorized => {
                tracing::warn!("Request without a valid session");
                (StatusCode::UNAUTHORIZED, self.to_string())
            }

            AppError::NotFound => {
                tracing::debug!("Resource not found");
                (StatusCode::NOT_FOUND, "Resource not found".to_string())
            }

            AppError::Storage(ref e) => {
                tracing::error!("Storage error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
            }

            AppError::Serialization(ref e) => {
                tracing::error!("Serialization error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
            }

            AppError::Statistics(ref e) => {
                tracing::error!("Statistics error: {}", e);
                (StatusCode::BAD_GATEWAY, "Statistics unavailable".to_string())
            }

            AppError::Encryption(ref msg) => {
                tracing::error!("Encryption error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Encryption error".to_string())
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = sonic_rs::to_string(&sonic_rs::json!({
            "error": message
        }))
        .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());

        (status, [(http::header::CONTENT_TYPE, "application/json")], body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::auth::PasswordRule;

    #[test]
    fn test_credentials_message_is_generic() {
        assert_eq!(
            AppError::InvalidCredentials.to_string(),
            "Invalid username or password"
        );
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
            (AppError::EmailTaken, StatusCode::CONFLICT),
            (AppError::UsernameTaken, StatusCode::CONFLICT),
            (
                AppError::Validation(ValidationError::WeakPassword(PasswordRule::MissingDigit)),
                StatusCode::BAD_REQUEST,
            ),
            (AppError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
