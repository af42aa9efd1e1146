use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::partial_json::PartialJsonError;

#[derive(Debug, Error)]
pub enum FragmentsApiError {
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
    /// Non-success response. Displays only the server-provided message so the
    /// caller can match on it the way the route authors phrase it.
    #[error("{message}")]
    Status { status: StatusCode, message: String },
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("malformed object stream: {0}")]
    MalformedObject(#[from] PartialJsonError),
    #[error("object stream ended without any content")]
    EmptyObject,
    #[error("request was cancelled")]
    Cancelled,
    #[error("{0}")]
    Unknown(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorPayload {
    Text { error: String },
    Nested { error: ErrorFields },
}

#[derive(Debug, Deserialize)]
struct ErrorFields {
    message: Option<String>,
}

/// Extract a human-readable message from an error response body.
///
/// Plain text bodies are returned as-is. JSON bodies of the shape
/// `{"error": "..."}` or `{"error": {"message": "..."}}` yield the inner text.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string();
    }

    let parsed = match serde_json::from_str::<ErrorPayload>(trimmed) {
        Ok(ErrorPayload::Text { error }) => Some(error),
        Ok(ErrorPayload::Nested { error }) => error.message,
        Err(_) => None,
    };

    parsed
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| trimmed.to_string())
}
