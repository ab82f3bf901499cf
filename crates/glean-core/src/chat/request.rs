use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::ChatMessage;

/// Chat request, serialized as the Chat API request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    /// Whether the remote service persists the exchange
    pub save_chat: bool,
    /// Whether the response is delivered incrementally
    pub stream: bool,
}

impl ChatRequest {
    /// Create an empty request that saves the chat and does not stream
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            save_chat: true,
            stream: false,
        }
    }

    /// Add a message to the request
    pub fn with_message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// Add multiple messages
    pub fn with_messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages.extend(messages);
        self
    }

    /// Set whether the chat is saved server-side
    pub fn save_chat(mut self, save: bool) -> Self {
        self.save_chat = save;
        self
    }

    /// Enable or disable streaming
    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Check the request shape: at least one message, every message with
    /// non-empty fragments.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.messages.is_empty() {
            return Err(ValidationError::NoMessages);
        }
        self.messages
            .iter()
            .enumerate()
            .try_for_each(|(index, message)| message.validate(index))
    }
}

impl Default for ChatRequest {
    fn default() -> Self {
        Self::new()
    }
}
