//! Conversation state: identifiers, data model and the single-writer store.

pub mod errors;
pub mod ids;
pub mod store;
pub mod types;

pub use errors::{ChatError, ChatResult};
pub use ids::{ClientId, ConversationId, MessageId};
pub use store::ConversationStore;
pub use types::{ChatState, Conversation, DEFAULT_TITLE, Message, NewMessage, Role};
