use serde_json::Value;

use super::{assistant_fragments, FRAGMENT_SEPARATOR};

/// One element of a streamed chat response
///
/// Each chunk is one JSON object from the newline-delimited response body.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatChunk {
    /// Zero-based arrival position within the stream
    pub index: usize,
    pub body: Value,
}

impl ChatChunk {
    /// Create a chunk
    pub fn new(index: usize, body: Value) -> Self {
        Self { index, body }
    }

    /// Text of every assistant fragment in this chunk
    pub fn assistant_fragments(&self) -> Vec<String> {
        assistant_fragments(&self.body)
    }

    /// Assistant text carried by this chunk, empty when there is none
    pub fn text(&self) -> String {
        self.assistant_fragments().join(FRAGMENT_SEPARATOR)
    }

    /// Server-side chat id, if the chunk reports one
    pub fn chat_id(&self) -> Option<&str> {
        self.body.get("chatId").and_then(Value::as_str)
    }
}
