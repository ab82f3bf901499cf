use serde_json::Value;

use super::{assistant_fragments, has_assistant_message, FRAGMENT_SEPARATOR};

/// Chat API response
///
/// The body is kept exactly as the remote service returned it. `saved`
/// records whether the request asked for the chat to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    pub body: Value,
    pub saved: bool,
}

impl ChatResponse {
    /// Create a new response
    pub fn new(body: Value, saved: bool) -> Self {
        Self { body, saved }
    }

    /// Server-side chat id, present when the chat was saved
    pub fn chat_id(&self) -> Option<&str> {
        self.body.get("chatId").and_then(Value::as_str)
    }

    /// Raw `messages` array of the response
    pub fn messages(&self) -> &[Value] {
        self.body
            .get("messages")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Text of every assistant fragment, in order
    pub fn assistant_fragments(&self) -> Vec<String> {
        assistant_fragments(&self.body)
    }

    /// Assistant fragments joined into a single string, if any assistant
    /// message is present
    pub fn assistant_text(&self) -> Option<String> {
        has_assistant_message(&self.body)
            .then(|| self.assistant_fragments().join(FRAGMENT_SEPARATOR))
    }

    /// Top-level `content` string used by alternative response formats
    pub fn content(&self) -> Option<&str> {
        self.body.get("content").and_then(Value::as_str)
    }

    /// Check if the body carries nothing
    pub fn is_empty(&self) -> bool {
        match &self.body {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            Value::Array(items) => items.is_empty(),
            _ => false,
        }
    }

    /// Consume the response, returning the raw body
    pub fn into_body(self) -> Value {
        self.body
    }
}
