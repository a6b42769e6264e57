use axum::{Json, http::StatusCode, response::IntoResponse, response::Response};
use thiserror::Error;

use mathnook_types::api::{ErrorBody, ErrorDetail};

pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const INVALID_SESSION: &str = "Invalid or expired secret session";
pub const CALLER_REQUIRED: &str = "Caller identity required";
pub const INVALID_URL: &str = "Invalid URL";
pub const HOST_NOT_ALLOWED: &str = "URL host is not allowed";
pub const PROXY_FAILED: &str = "Failed to fetch proxy content";
pub const STORAGE_FAILED: &str = "Storage unavailable";

/// Errors surfaced to secret-panel callers. Messages are fixed strings so
/// nothing about internal state leaks out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecretError {
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("{0}")]
    Internal(&'static str),
}

impl SecretError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl IntoResponse for SecretError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
            },
        };
        (self.status(), Json(body)).into_response()
    }
}
