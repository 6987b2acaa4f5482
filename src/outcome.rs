use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::{AppError, Result};

/// The status of a command, independent of the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Ok,
    Created,
    NoContent,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    ServerError,
}

impl StatusKind {
    /// Whether the status reports a successful command.
    pub fn is_success(self) -> bool {
        matches!(self, StatusKind::Ok | StatusKind::Created | StatusKind::NoContent)
    }

    /// The HTTP status code for this kind.
    pub fn http_status(self) -> StatusCode {
        match self {
            StatusKind::Ok => StatusCode::OK,
            StatusKind::Created => StatusCode::CREATED,
            StatusKind::NoContent => StatusCode::NO_CONTENT,
            StatusKind::BadRequest => StatusCode::BAD_REQUEST,
            StatusKind::Unauthorized => StatusCode::UNAUTHORIZED,
            StatusKind::Forbidden => StatusCode::FORBIDDEN,
            StatusKind::NotFound => StatusCode::NOT_FOUND,
            StatusKind::Conflict => StatusCode::CONFLICT,
            StatusKind::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// The result envelope every command returns.
///
/// A successful outcome may carry a payload; a failed one carries a message
/// that is safe to show the caller.
#[derive(Debug)]
pub struct Outcome<T = ()> {
    pub status: StatusKind,
    pub message: Option<String>,
    pub payload: Option<T>,
}

impl<T> Outcome<T> {
    /// A failed outcome.
    pub fn fail(status: StatusKind, message: impl Into<String>) -> Self {
        Self {
            status,
            message: Some(message.into()),
            payload: None,
        }
    }

    /// Turns a command result into an outcome, using `success` when it is `Ok`.
    pub fn from_result(result: Result<T>, success: StatusKind) -> Self {
        match result {
            Ok(payload) => Self {
                status: success,
                message: None,
                payload: Some(payload),
            },
            Err(e) => e.into(),
        }
    }

    /// Maps the payload, keeping status and message.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            status: self.status,
            message: self.message,
            payload: self.payload.map(f),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

impl<T> From<AppError> for Outcome<T> {
    fn from(error: AppError) -> Self {
        let (status, message) = error.classify();
        Self::fail(status, message)
    }
}

impl<T: Serialize> IntoResponse for Outcome<T> {
    fn into_response(self) -> Response {
        let status = self.status.http_status();

        if self.status == StatusKind::NoContent {
            return status.into_response();
        }

        let serialized = if self.status.is_success() {
            match &self.payload {
                Some(payload) => sonic_rs::to_string(payload),
                None => Ok("{}".to_string()),
            }
        } else {
            sonic_rs::to_string(&sonic_rs::json!({
                "error": self.message.unwrap_or_default()
            }))
        };

        let body = serialized.unwrap_or_else(|e| {
            tracing::error!("❌ Response serialization failed: {}", e);
            r#"{"error":"Internal server error"}"#.to_string()
        });

        (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
    }
}
