//! Error normalization for the service API.
//!
//! The service is inconsistent about error bodies: sometimes JSON with a
//! `detail` or `message` field, sometimes plain text, sometimes nothing.
//! Everything is normalized here, at the boundary, so callers only ever
//! see one human-readable message per failure.

use thiserror::Error;

/// A non-2xx response body, tagged by how it was parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorBody {
    /// JSON body with a `detail` or `message` field.
    Structured { message: String },
    /// Anything else that was non-empty.
    Raw { text: String },
}

impl ErrorBody {
    /// Parses a response body, preferring the structured shape.
    ///
    /// Returns `None` when the body is empty or whitespace, in which case
    /// the caller should fall back to `HTTP <status>`.
    pub fn parse(body: &str) -> Option<Self> {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
            let message = value
                .get("detail")
                .and_then(|v| v.as_str())
                .or_else(|| value.get("message").and_then(|v| v.as_str()));
            if let Some(message) = message {
                return Some(ErrorBody::Structured {
                    message: message.to_string(),
                });
            }
        }
        let trimmed = body.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(ErrorBody::Raw {
                text: trimmed.to_string(),
            })
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ErrorBody::Structured { message } => message,
            ErrorBody::Raw { text } => text,
        }
    }
}

/// A failed API call, already normalized to a displayable message.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network unreachable, timeout, or a malformed response.
    #[error("connection failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// HTTP 401 on an authenticated call. The session must be invalidated.
    #[error("{message}")]
    Unauthorized { message: String },

    /// Any other non-2xx status.
    #[error("{message}")]
    Status { status: u16, message: String },
}

impl ApiError {
    /// Builds the error for a non-2xx `status` from its raw body text.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = match ErrorBody::parse(body) {
            Some(body) => body.message().to_string(),
            None => format!("HTTP {status}"),
        };
        if status == 401 {
            ApiError::Unauthorized { message }
        } else {
            ApiError::Status { status, message }
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
