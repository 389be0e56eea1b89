//! Outbound calls to the agent backend.
//!
//! The conversation store never performs I/O itself. The controller talks
//! to the backend through [`AgentTransport`], which keeps the send flow
//! testable without a network.

pub mod error;
pub mod http;
pub mod types;

use async_trait::async_trait;

use crate::chat::ClientId;

pub use error::{ClientError, ClientResult, SEND_FALLBACK_MESSAGE};
pub use http::HttpAgentClient;
pub use types::{
    ErrorBody, HistoryEntry, HistoryResponse, ResetResponse, SendMessageRequest,
    SendMessageResponse,
};

/// Request/response channel to a backend agent.
#[async_trait]
pub trait AgentTransport: Send + Sync {
    /// Send user text and return the agent's reply.
    async fn send_message(&self, content: &str, client_id: &ClientId) -> ClientResult<String>;

    /// Fetch the backend's history for this client.
    async fn history(&self, client_id: &ClientId) -> ClientResult<Vec<HistoryEntry>>;

    /// Clear the backend's history for this client and return its status text.
    async fn reset(&self, client_id: &ClientId) -> ClientResult<String>;
}
