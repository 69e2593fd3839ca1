//! Error taxonomy for upstream API calls
//!
//! Status handling is split between the fetcher (which swallows 401/404)
//! and callers that surface everything else to the operator.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised while talking to the telephony backend
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP 401 - the bearer token was rejected
    #[error("authentication failed (401): {body}")]
    Authentication { body: String },

    /// HTTP 404 - the resource path does not exist for this connection
    #[error("resource not found (404): {url}")]
    NotFound { url: String },

    /// The number(s) are already registered as endpoints
    #[error("endpoint already exists ({status}): {body}")]
    Conflict { status: StatusCode, body: String },

    /// Any other 4xx/5xx response
    #[error("API request failed ({status}): {body}")]
    Upstream { status: StatusCode, body: String },

    /// Connection refused, DNS failure, timeout
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body was not the JSON we expected
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl ApiError {
    /// Build the error for a non-success status.
    ///
    /// This is the only place a failure body is inspected for the
    /// conflict wording.
    pub fn from_status(status: StatusCode, url: &str, body: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => ApiError::Authentication { body },
            StatusCode::NOT_FOUND => ApiError::NotFound {
                url: url.to_string(),
            },
            _ if is_conflict_message(&format!("{status} {body}")) => {
                ApiError::Conflict { status, body }
            }
            _ => ApiError::Upstream { status, body },
        }
    }

    /// Upstream status code, when the error came from an HTTP response
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Authentication { .. } => Some(StatusCode::UNAUTHORIZED),
            ApiError::NotFound { .. } => Some(StatusCode::NOT_FOUND),
            ApiError::Conflict { status, .. } | ApiError::Upstream { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status(),
            ApiError::Decode(_) | ApiError::InvalidUrl { .. } => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiError::Conflict { .. })
    }
}

/// Detect the "number already registered" failure.
///
/// The backend has no structured code for this; it only says so in the
/// message text. Tied to the vendor's wording: if they rephrase it,
/// conflicts will surface as plain upstream errors.
pub fn is_conflict_message(text: &str) -> bool {
    text.to_lowercase().contains("already exist")
}

/// Format API errors into operator-friendly messages
pub fn format_api_error(err: &ApiError) -> String {
    match err {
        ApiError::Authentication { .. } => {
            "Unauthorized - token is expired or invalid".to_string()
        }
        ApiError::NotFound { url } => format!("Endpoint not found - check the API URL ({url})"),
        ApiError::Conflict { .. } => {
            "One or more phone numbers already exist as endpoints".to_string()
        }
        ApiError::Transport(e) if e.is_timeout() => {
            "Request timed out - check connection".to_string()
        }
        ApiError::Transport(e) if e.is_connect() => {
            "Connection failed - check network and base URL".to_string()
        }
        other => {
            let text = other.to_string();
            if text.len() > 200 {
                let cut = text
                    .char_indices()
                    .map(|(i, _)| i)
                    .take_while(|i| *i <= 200)
                    .last()
                    .unwrap_or(0);
                format!("{}...", &text[..cut])
            } else {
                text
            }
        }
    }
}
