//! Error types for outbound agent calls.

use thiserror::Error;

/// Message shown when a failure carries no usable text.
pub const SEND_FALLBACK_MESSAGE: &str = "Failed to send message";

/// Errors that can occur while talking to the agent backend.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure (connect, timeout, TLS, body read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("request failed with status {status}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// `detail` field of the error body, when present.
        detail: Option<String>,
    },

    /// The configured base URL is unusable.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A success body could not be decoded.
    #[error("JSON parsing error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    /// Text suitable for a user-facing notification.
    ///
    /// A backend rejection shows its structured `detail`, or
    /// [`SEND_FALLBACK_MESSAGE`] when it carries none. Local failures show
    /// this error's own text.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { detail, .. } => detail
                .as_deref()
                .filter(|detail| !detail.trim().is_empty())
                .map_or_else(|| SEND_FALLBACK_MESSAGE.to_string(), str::to_string),
            other => other.to_string(),
        }
    }
}

/// Convenience result alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
