//! Top-level controller that owns the conversation store.
//!
//! The controller is the only writer. It turns user intents into store
//! transitions and runs the message send flow:
//!
//! 1. append the user message (optimistic, before the backend answers),
//! 2. mark loading and call the backend,
//! 3. append the reply, or record the error and raise a notification,
//! 4. clear loading in every outcome.
//!
//! [`ChatController::send`] runs all four steps. A display layer that wants
//! to observe the in-flight window calls [`ChatController::begin_send`],
//! [`ChatController::deliver`] and [`ChatController::finish_send`] itself;
//! only `deliver` suspends, and it borrows the controller shared, so the
//! store can be read while the backend is working.
//!
//! Errors are caught here and never propagate to the caller.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::chat::{ChatError, ClientId, ConversationId, ConversationStore, NewMessage};
use crate::client::{AgentTransport, ClientResult, HistoryEntry};

/// Default lifetime of a notification.
pub const DEFAULT_NOTIFICATION_TTL: Duration = Duration::from_secs(6);

/// Notification severity.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Severity {
    /// Positive confirmation.
    Success,
    /// Failure the user should see.
    Error,
}

/// Transient, dismissable message shown to the user.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notification {
    /// Text to display.
    pub message: String,
    /// Severity.
    pub severity: Severity,
    /// Instant after which the notification is hidden.
    pub expires_at: Instant,
}

impl Notification {
    /// True while the notification should still be shown.
    #[must_use]
    pub fn is_active(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Result of [`ChatController::send`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SendOutcome {
    /// Input was blank; nothing happened.
    Ignored,
    /// Both the user message and the reply were appended.
    Replied,
    /// The send failed; the error has been recorded.
    Failed(ChatError),
}

/// A send whose user message is already in the store, awaiting the backend.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PendingSend {
    conversation_id: ConversationId,
    content: String,
}

impl PendingSend {
    /// Conversation the reply will be appended to.
    #[must_use]
    pub const fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }
}

/// Owns the store, the transport and the session's client id.
pub struct ChatController<T> {
    store: ConversationStore,
    transport: T,
    client_id: ClientId,
    notification: Option<Notification>,
    notification_ttl: Duration,
}

impl<T: AgentTransport> ChatController<T> {
    /// Create a controller with an empty store.
    #[must_use]
    pub fn new(transport: T, client_id: ClientId) -> Self {
        Self {
            store: ConversationStore::new(),
            transport,
            client_id,
            notification: None,
            notification_ttl: DEFAULT_NOTIFICATION_TTL,
        }
    }

    /// Override how long notifications stay visible.
    #[must_use]
    pub fn with_notification_ttl(mut self, ttl: Duration) -> Self {
        self.notification_ttl = ttl;
        self
    }

    /// Read-only access to the store.
    #[must_use]
    pub const fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Session client id.
    #[must_use]
    pub const fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    /// Create the first conversation when the store is empty.
    pub fn on_load(&mut self) -> ConversationId {
        self.store.ensure_conversation()
    }

    /// Send user text to the agent and wait for the reply.
    pub async fn send(&mut self, text: &str) -> SendOutcome {
        let pending = match self.begin_send(text) {
            Ok(pending) => pending,
            Err(outcome) => return outcome,
        };
        let result = self.deliver(&pending).await;
        self.finish_send(pending.conversation_id, result)
    }

    /// Append the user message to the current conversation and mark loading.
    ///
    /// # Errors
    /// Returns the final outcome when nothing is sent: `Ignored` for blank
    /// input, `Failed` (already recorded) when no conversation is selected.
    pub fn begin_send(&mut self, text: &str) -> Result<PendingSend, SendOutcome> {
        if text.trim().is_empty() {
            return Err(SendOutcome::Ignored);
        }

        let Some(conversation_id) = self.store.current_conversation_id() else {
            return Err(self.fail(ChatError::NoActiveConversation));
        };

        if let Err(e) = self.store.add_message(conversation_id, NewMessage::user(text)) {
            return Err(self.fail(e));
        }
        self.store.set_error(None);
        self.store.set_loading(true);
        debug!(conversation_id = %conversation_id, "awaiting agent reply");

        Ok(PendingSend {
            conversation_id,
            content: text.to_string(),
        })
    }

    /// Call the backend for a pending send.
    ///
    /// # Errors
    /// Returns the transport error unchanged; pass it to [`Self::finish_send`].
    pub async fn deliver(&self, pending: &PendingSend) -> ClientResult<String> {
        self.transport
            .send_message(&pending.content, &self.client_id)
            .await
    }

    /// Record the backend's answer and clear loading.
    ///
    /// The reply goes to `conversation_id`, the conversation that was current
    /// when the send began.
    pub fn finish_send(
        &mut self,
        conversation_id: ConversationId,
        result: ClientResult<String>,
    ) -> SendOutcome {
        let outcome = match result {
            Ok(reply) => {
                match self.store.add_message(conversation_id, NewMessage::assistant(reply)) {
                    Ok(_) => SendOutcome::Replied,
                    Err(e) => self.fail(e),
                }
            }
            Err(e) => {
                warn!(error = %e, "send failed");
                self.fail(ChatError::SendFailed(e.user_message()))
            }
        };

        self.store.set_loading(false);
        outcome
    }

    /// Create and select a new conversation.
    pub fn new_conversation(&mut self) -> ConversationId {
        self.store.create_conversation()
    }

    /// Select a conversation. Unknown ids raise an error notification.
    pub fn select_conversation(&mut self, id: ConversationId) -> bool {
        self.apply(|store| store.set_current_conversation(id))
    }

    /// Delete a conversation. Unknown ids raise an error notification.
    pub fn delete_conversation(&mut self, id: ConversationId) -> bool {
        self.apply(|store| store.delete_conversation(id))
    }

    /// Rename a conversation. Unknown ids raise an error notification.
    pub fn rename_conversation(&mut self, id: ConversationId, title: &str) -> bool {
        self.apply(|store| store.rename_conversation(id, title))
    }

    /// Clear the backend history for this client.
    pub async fn reset_remote(&mut self) -> bool {
        match self.transport.reset(&self.client_id).await {
            Ok(message) => {
                info!(client_id = %self.client_id, "backend history reset");
                self.notify(message, Severity::Success);
                true
            }
            Err(e) => {
                let message = e.user_message();
                self.store.set_error(Some(message.clone()));
                self.notify(message, Severity::Error);
                false
            }
        }
    }

    /// Fetch the backend history for this client.
    ///
    /// Returns `None` after recording an error notification on failure.
    pub async fn fetch_history(&mut self) -> Option<Vec<HistoryEntry>> {
        match self.transport.history(&self.client_id).await {
            Ok(history) => Some(history),
            Err(e) => {
                let message = e.user_message();
                self.store.set_error(Some(message.clone()));
                self.notify(message, Severity::Error);
                None
            }
        }
    }

    /// Notification to show at `now`, if one is pending and unexpired.
    #[must_use]
    pub fn active_notification(&self, now: Instant) -> Option<&Notification> {
        self.notification.as_ref().filter(|n| n.is_active(now))
    }

    /// Hide the current notification.
    pub fn dismiss_notification(&mut self) {
        self.notification = None;
    }

    fn apply(
        &mut self,
        transition: impl FnOnce(&mut ConversationStore) -> Result<(), ChatError>,
    ) -> bool {
        match transition(&mut self.store) {
            Ok(()) => true,
            Err(e) => {
                self.notify(e.to_string(), Severity::Error);
                false
            }
        }
    }

    fn fail(&mut self, error: ChatError) -> SendOutcome {
        let message = error.to_string();
        self.store.set_error(Some(message.clone()));
        self.notify(message, Severity::Error);
        SendOutcome::Failed(error)
    }

    fn notify(&mut self, message: String, severity: Severity) {
        self.notification = Some(Notification {
            message,
            severity,
            expires_at: Instant::now() + self.notification_ttl,
        });
    }
}
