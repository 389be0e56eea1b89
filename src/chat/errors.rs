//! Error types for the chat subsystem.

use thiserror::Error;

use crate::chat::ids::ConversationId;

/// Chat subsystem error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// A send was attempted with no selected conversation.
    #[error("No active conversation")]
    NoActiveConversation,
    /// The referenced conversation does not exist.
    #[error("conversation not found: {0}")]
    ConversationNotFound(ConversationId),
    /// The outbound call was rejected or failed.
    #[error("{0}")]
    SendFailed(String),
}

/// Convenience result alias for chat operations.
pub type ChatResult<T> = Result<T, ChatError>;
