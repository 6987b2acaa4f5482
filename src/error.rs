use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::outcome::{Outcome, StatusKind};

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A database error.
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// A connection pool error.
    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// A column was missing or had an unexpected type.
    #[error("Missing data: {0}")]
    MissingData(String),

    /// An authentication error with a message safe to show the caller.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A token or credential failed verification.
    #[error("Unauthorized")]
    Unauthorized,

    /// The caller is known but not allowed to do this.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A resource not found error.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A uniqueness conflict (login or email already taken).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An encryption error.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// A token signing error.
    #[error("Token error: {0}")]
    Token(String),

    /// An email delivery error.
    #[error("Email error: {0}")]
    Email(String),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl From<garde::Report> for AppError {
    fn from(report: garde::Report) -> Self {
        AppError::Validation(report.to_string())
    }
}

impl AppError {
    /// Maps the error onto the envelope status and the message the caller sees.
    ///
    /// Server-side failures are logged here and replaced with a generic message.
    pub fn classify(&self) -> (StatusKind, String) {
        match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusKind::ServerError, "Database error".to_string())
            }

            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                (StatusKind::ServerError, "Database error".to_string())
            }

            AppError::MissingData(column) => {
                tracing::error!("Missing data in column: {}", column);
                (StatusKind::ServerError, "Database error".to_string())
            }

            AppError::Authentication(msg) => {
                tracing::warn!("Authentication failed: {}", msg);
                (StatusKind::Unauthorized, msg.clone())
            }

            AppError::Unauthorized => {
                tracing::warn!("Unauthorized request");
                (StatusKind::Unauthorized, "Unauthorized".to_string())
            }

            AppError::Forbidden(msg) => {
                tracing::warn!("Forbidden: {}", msg);
                (StatusKind::Forbidden, msg.clone())
            }

            AppError::NotFound(msg) => {
                tracing::debug!("Resource not found: {}", msg);
                (StatusKind::NotFound, msg.clone())
            }

            AppError::Conflict(msg) => {
                tracing::debug!("Conflict: {}", msg);
                (StatusKind::Conflict, msg.clone())
            }

            AppError::Validation(msg) => {
                tracing::debug!("Validation error: {}", msg);
                (StatusKind::BadRequest, msg.clone())
            }

            AppError::Encryption(msg) => {
                tracing::error!("Encryption error: {}", msg);
                (StatusKind::ServerError, "Encryption error".to_string())
            }

            AppError::Token(msg) => {
                tracing::error!("Token error: {}", msg);
                (StatusKind::ServerError, "Token creation failed".to_string())
            }

            AppError::Email(msg) => {
                tracing::error!("Email error: {}", msg);
                (StatusKind::ServerError, "Failed to send email".to_string())
            }

            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusKind::ServerError, "Internal server error".to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        Outcome::<()>::from(self).into_response()
    }
}
