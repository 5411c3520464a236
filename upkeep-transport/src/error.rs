//! Typed error type for transport operations.

use std::collections::BTreeMap;

use thiserror::Error;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// Per-field server messages, keyed by field name.
pub type FieldErrorMap = BTreeMap<String, Vec<String>>;

/// Errors surfaced by the transport.
///
/// Field, server, unrecognized and malformed errors are for the calling
/// component to display. Status and network errors are also escalated to the
/// page-wide notifier. `Unauthorized` has already been handled by redirect.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Envelope reported failure with a per-field error map
    #[error("{}", .message.as_deref().unwrap_or("please correct the highlighted fields"))]
    FieldErrors {
        message: Option<String>,
        errors: FieldErrorMap,
    },

    /// Envelope reported failure with only a message
    #[error("{message}")]
    Server { message: String },

    /// Envelope reported failure with neither errors nor message
    #[error("the server could not complete the request")]
    Unrecognized,

    /// Response missing the expected envelope
    #[error("unexpected response from server: {detail}")]
    MalformedEnvelope { detail: String },

    /// Non-2xx response without a usable envelope
    #[error("HTTP {status}: {}", status_copy(.status))]
    Status { status: u16 },

    /// Connection failure or unreadable body
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// 401; credentials cleared and the page redirected to login
    #[error("session expired")]
    Unauthorized,

    /// Request could not be built (bad URL, bad media type)
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    pub fn malformed(detail: impl Into<String>) -> Self {
        ApiError::MalformedEnvelope {
            detail: detail.into(),
        }
    }

    /// Copy shown to the user for this error.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status { status } => status_message(*status).to_string(),
            ApiError::Network(_) => {
                "Unable to reach the server. Check your connection and try again.".to_string()
            }
            ApiError::MalformedEnvelope { .. } => {
                "Received an unexpected response from the server.".to_string()
            }
            ApiError::Unauthorized => status_message(401).to_string(),
            other => other.to_string(),
        }
    }

    /// Whether this error goes to the page-wide notifier rather than
    /// component-local display.
    pub fn is_escalated(&self) -> bool {
        matches!(self, ApiError::Status { .. } | ApiError::Network(_))
    }

    /// Field error map, `None` for every other variant.
    pub fn field_errors(&self) -> Option<&FieldErrorMap> {
        match self {
            ApiError::FieldErrors { errors, .. } => Some(errors),
            _ => None,
        }
    }
}

fn status_copy(status: &u16) -> &'static str {
    status_message(*status)
}

/// User-facing copy for an HTTP status.
pub fn status_message(status: u16) -> &'static str {
    match status {
        401 => "Your session has expired. Please log in again.",
        403 => "You do not have permission to perform this action.",
        404 => "The requested resource was not found.",
        500..=599 => "The server encountered an error. Please try again later.",
        _ => "The request could not be completed.",
    }
}
