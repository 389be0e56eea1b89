//! In-memory conversation store.
//!
//! The store is the single owner of every conversation and of the active
//! selection. It is mutated only through the transition methods below, each
//! of which runs to completion before the next one starts (`&mut self`).
//!
//! Invariants kept by every transition:
//! - `current` is `None` only when there are no conversations, and otherwise
//!   always names an existing conversation.
//! - Messages are append-only and never move between conversations.
//! - Within a conversation, message timestamps never decrease.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::chat::errors::{ChatError, ChatResult};
use crate::chat::ids::{ConversationId, MessageId};
use crate::chat::types::{ChatState, Conversation, DEFAULT_TITLE, Message, NewMessage};

/// Single-writer container for conversations and the active selection.
#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: Vec<Conversation>,
    current: Option<ConversationId>,
    loading: bool,
    error: Option<String>,
}

impl ConversationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ===== Transitions ======================================================

    /// Create a conversation, append it to the list and select it.
    pub fn create_conversation(&mut self) -> ConversationId {
        let conversation = Conversation::new(Utc::now());
        let id = conversation.id;
        self.conversations.push(conversation);
        self.current = Some(id);
        info!(conversation_id = %id, "created conversation");
        id
    }

    /// Create and select a conversation if the store is empty.
    ///
    /// Returns the selected conversation id.
    pub fn ensure_conversation(&mut self) -> ConversationId {
        match self.current {
            Some(id) => id,
            None => self.create_conversation(),
        }
    }

    /// Select an existing conversation.
    ///
    /// # Errors
    /// Returns `ConversationNotFound` if `id` is unknown; the selection is unchanged.
    pub fn set_current_conversation(&mut self, id: ConversationId) -> ChatResult<()> {
        if self.position(id).is_none() {
            return Err(ChatError::ConversationNotFound(id));
        }
        self.current = Some(id);
        debug!(conversation_id = %id, "switched conversation");
        Ok(())
    }

    /// Append a message to a conversation and bump its `last_updated`.
    ///
    /// # Errors
    /// Returns `ConversationNotFound` if `conversation_id` is unknown; nothing is modified.
    pub fn add_message(
        &mut self,
        conversation_id: ConversationId,
        message: NewMessage,
    ) -> ChatResult<MessageId> {
        let conversation = self
            .conversation_mut(conversation_id)
            .ok_or(ChatError::ConversationNotFound(conversation_id))?;

        let timestamp = monotonic_now(conversation.last_updated);
        let id = MessageId::new();
        conversation.messages.push(Message {
            id,
            content: message.content,
            role: message.role,
            timestamp,
        });
        conversation.last_updated = timestamp;

        debug!(
            conversation_id = %conversation_id,
            message_id = %id,
            role = %message.role,
            "appended message"
        );
        Ok(id)
    }

    /// Remove a conversation.
    ///
    /// When the removed conversation was selected, the first remaining
    /// conversation becomes current, or nothing if the list is now empty.
    ///
    /// # Errors
    /// Returns `ConversationNotFound` if `id` is unknown; nothing is removed.
    pub fn delete_conversation(&mut self, id: ConversationId) -> ChatResult<()> {
        let index = self
            .position(id)
            .ok_or(ChatError::ConversationNotFound(id))?;
        self.conversations.remove(index);

        if self.current == Some(id) {
            self.current = self.conversations.first().map(|c| c.id);
        }

        info!(conversation_id = %id, remaining = self.conversations.len(), "deleted conversation");
        Ok(())
    }

    /// Change a conversation's display title.
    ///
    /// Blank titles fall back to the default title.
    ///
    /// # Errors
    /// Returns `ConversationNotFound` if `id` is unknown.
    pub fn rename_conversation(&mut self, id: ConversationId, title: &str) -> ChatResult<()> {
        let conversation = self
            .conversation_mut(id)
            .ok_or(ChatError::ConversationNotFound(id))?;
        let title = title.trim();
        conversation.title = if title.is_empty() {
            DEFAULT_TITLE.to_string()
        } else {
            title.to_string()
        };
        debug!(conversation_id = %id, title = %conversation.title, "renamed conversation");
        Ok(())
    }

    /// Mark whether a send is in flight.
    pub const fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    /// Record (or clear) the last error.
    pub fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }

    // ===== Readers ==========================================================

    /// Conversations in creation order.
    #[must_use]
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Look up a conversation by id.
    #[must_use]
    pub fn conversation(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    /// Currently selected conversation id.
    #[must_use]
    pub const fn current_conversation_id(&self) -> Option<ConversationId> {
        self.current
    }

    /// Currently selected conversation.
    #[must_use]
    pub fn current_conversation(&self) -> Option<&Conversation> {
        self.current.and_then(|id| self.conversation(id))
    }

    /// True while a send is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Last recorded error.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Owned copy of the full state.
    #[must_use]
    pub fn snapshot(&self) -> ChatState {
        ChatState {
            conversations: self.conversations.clone(),
            current_conversation_id: self.current,
            is_loading: self.loading,
            error: self.error.clone(),
        }
    }

    fn position(&self, id: ConversationId) -> Option<usize> {
        self.conversations.iter().position(|c| c.id == id)
    }

    fn conversation_mut(&mut self, id: ConversationId) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.id == id)
    }
}

/// Current time, never earlier than `floor`.
fn monotonic_now(floor: DateTime<Utc>) -> DateTime<Utc> {
    Utc::now().max(floor)
}
