//! Reply generation for the relay backend.

pub mod ollama;

use async_trait::async_trait;
use thiserror::Error;

use crate::client::HistoryEntry;

pub use ollama::OllamaChat;

/// Errors produced while generating a reply.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP client error.
    #[error("http client error: {0}")]
    HttpClient(#[from] reqwest::Error),
    /// The model server answered with a non-success status.
    #[error("ollama http status not ok: {0}")]
    HttpStatusNotOk(u16),
    /// The model produced no text.
    #[error("model returned an empty reply")]
    EmptyReply,
    /// The configured URL is unusable.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

/// Convenience result alias for generation.
pub type LlmResult<T> = Result<T, LlmError>;

/// Produces the assistant's next turn from the full conversation history.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// Generate a reply. `history` ends with the user turn being answered.
    async fn generate(&self, history: &[HistoryEntry]) -> LlmResult<String>;
}
