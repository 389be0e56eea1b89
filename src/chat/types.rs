//! Message and conversation model shown by the chat transcript.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::chat::ids::{ConversationId, MessageId};

/// Title given to every freshly created conversation.
pub const DEFAULT_TITLE: &str = "New Conversation";

/// Author of a message.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Text typed by the local user.
    User,
    /// Reply produced by the backend agent.
    Assistant,
}

impl Role {
    /// Stable string form used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            _ => Err(value.to_string()),
        }
    }
}

/// Caller-supplied part of a message; id and timestamp are assigned on append.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    /// Message text.
    pub content: String,
    /// Author.
    pub role: Role,
}

impl NewMessage {
    /// Build a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            role: Role::User,
        }
    }

    /// Build an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            role: Role::Assistant,
        }
    }
}

/// A message stored in a conversation. Never edited after creation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique identifier.
    pub id: MessageId,
    /// Message text.
    pub content: String,
    /// Author.
    pub role: Role,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
}

/// An ordered thread of messages with its own identity.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Unique identifier.
    pub id: ConversationId,
    /// Display label in the sidebar.
    pub title: String,
    /// Messages in display order.
    pub messages: Vec<Message>,
    /// Time of the most recent append (or creation).
    pub last_updated: DateTime<Utc>,
}

impl Conversation {
    /// Create an empty conversation with the default title.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            id: ConversationId::new(),
            title: DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
            last_updated: now,
        }
    }

    /// Most recent message, if any.
    #[must_use]
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// Read-only snapshot of the whole store, for display layers.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatState {
    /// Conversations in creation order.
    pub conversations: Vec<Conversation>,
    /// Selected conversation.
    pub current_conversation_id: Option<ConversationId>,
    /// True while a send is in flight.
    pub is_loading: bool,
    /// Last error text.
    pub error: Option<String>,
}
