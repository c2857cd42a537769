//! Error taxonomy shared across the whole service.
//!
//! Every fallible operation that can surface to an HTTP client returns
//! (or converts into) [`AppError`]. Each variant carries its own HTTP status
//! mapping via [`AppError::status_code`] and renders as the single error
//! envelope via its `IntoResponse` impl.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("overloaded")]
    Overloaded,

    #[error("service shutting down")]
    Draining,

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("browser engine error: {0}")]
    Browser(String),

    #[error("content extraction failed: {0}")]
    ContentExtraction(String),

    #[error("response too large")]
    ResponseTooLarge,

    #[error("cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::NotFound(_) => "not_found",
            AppError::Overloaded => "overloaded",
            AppError::Draining => "draining",
            AppError::Timeout(_) => "timeout",
            AppError::Browser(_) => "browser",
            AppError::ContentExtraction(_) => "content_extraction",
            AppError::ResponseTooLarge => "response_too_large",
            AppError::Cancelled => "cancelled",
            AppError::Internal(_) => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Overloaded => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Draining => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Browser(_) => StatusCode::BAD_GATEWAY,
            AppError::ContentExtraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ResponseTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            // Cancellation has no exact HTTP-status cousin; surface as a
            // client-side failure rather than invent a nonstandard code.
            AppError::Cancelled => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// `details` string carried in the error envelope, when one applies.
    pub fn details(&self) -> Option<String> {
        match self {
            AppError::Validation(d)
            | AppError::Timeout(d)
            | AppError::Browser(d)
            | AppError::ContentExtraction(d)
            | AppError::Internal(d) => Some(d.clone()),
            AppError::NotFound(d) => Some(d.clone()),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorObj,
}

#[derive(Serialize)]
struct ErrorObj {
    code: u16,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), error = %self, "request failed");
        } else {
            tracing::warn!(kind = self.kind(), error = %self, "request rejected");
        }

        let body = ErrorBody {
            error: ErrorObj {
                code: status.as_u16(),
                message: self.to_string(),
                details: self.details(),
            },
        };
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
