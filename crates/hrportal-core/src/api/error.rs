use std::fmt;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use super::classify::ERROR_MESSAGE;

/// Message and raw payload of a failed response.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorBody {
    pub message: String,
    pub raw: Value,
}

impl fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(ErrorBody),

    #[error("Access denied: {0}")]
    AccessDenied(ErrorBody),

    #[error("Resource not found: {0}")]
    NotFound(ErrorBody),

    #[error("Rate limited: {0}")]
    RateLimited(ErrorBody),

    #[error("Server error ({status}): {body}")]
    ServerError { status: StatusCode, body: ErrorBody },

    #[error("Unexpected status {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: ErrorBody },

    #[error("Network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Maximum length for raw error bodies carried as text
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..end],
                body.len()
            )
        }
    }

    pub fn from_status(status: StatusCode, raw: Value) -> Self {
        let body = ErrorBody {
            message: ERROR_MESSAGE.resolve(&raw),
            raw,
        };
        match status.as_u16() {
            401 => ApiError::Unauthorized(body),
            403 => ApiError::AccessDenied(body),
            404 => ApiError::NotFound(body),
            429 => ApiError::RateLimited(body),
            500..=599 => ApiError::ServerError { status, body },
            _ => ApiError::UnexpectedStatus { status, body },
        }
    }

    /// HTTP status of the failed response; `None` when nothing was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Unauthorized(_) => Some(StatusCode::UNAUTHORIZED),
            ApiError::AccessDenied(_) => Some(StatusCode::FORBIDDEN),
            ApiError::NotFound(_) => Some(StatusCode::NOT_FOUND),
            ApiError::RateLimited(_) => Some(StatusCode::TOO_MANY_REQUESTS),
            ApiError::ServerError { status, .. } | ApiError::UnexpectedStatus { status, .. } => {
                Some(*status)
            }
            ApiError::Network(_) | ApiError::InvalidResponse(_) | ApiError::InvalidRequest(_) => {
                None
            }
        }
    }

    pub fn body(&self) -> Option<&ErrorBody> {
        match self {
            ApiError::Unauthorized(body)
            | ApiError::AccessDenied(body)
            | ApiError::NotFound(body)
            | ApiError::RateLimited(body)
            | ApiError::ServerError { body, .. }
            | ApiError::UnexpectedStatus { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Human-readable message, falling back to the generic text when the
    /// failure carried no body.
    pub fn message(&self) -> String {
        match self.body() {
            Some(body) => body.message.clone(),
            None => ERROR_MESSAGE.fallback.to_string(),
        }
    }

    /// A "get record" call answering 404 usually means "no record yet".
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Network(Box::new(err))
    }
}
