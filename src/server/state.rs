//! Application state shared across all request handlers.

use std::sync::Arc;

use dashmap::DashMap;

use crate::client::HistoryEntry;
use crate::llm::ReplyGenerator;

/// Shared application state.
pub struct AppState {
    /// Reply generator (Ollama in production).
    pub generator: Arc<dyn ReplyGenerator>,
    /// Conversation history keyed by client id.
    histories: DashMap<String, Vec<HistoryEntry>>,
}

impl AppState {
    /// Create a new application state with empty histories.
    #[must_use]
    pub fn new(generator: Arc<dyn ReplyGenerator>) -> Arc<Self> {
        Arc::new(Self {
            generator,
            histories: DashMap::new(),
        })
    }

    /// Append an entry to a client's history and return a copy of the full history.
    pub fn append(&self, client_id: &str, entry: HistoryEntry) -> Vec<HistoryEntry> {
        let mut history = self.histories.entry(client_id.to_string()).or_default();
        history.push(entry);
        history.clone()
    }

    /// Copy of a client's history (empty for unknown clients).
    #[must_use]
    pub fn history(&self, client_id: &str) -> Vec<HistoryEntry> {
        self.histories
            .get(client_id)
            .map(|h| h.clone())
            .unwrap_or_default()
    }

    /// Clear a client's history.
    pub fn reset(&self, client_id: &str) {
        self.histories.insert(client_id.to_string(), Vec::new());
    }
}
