pub mod request;
pub mod response;
pub mod chunk;

pub use request::ChatRequest;
pub use response::ChatResponse;
pub use chunk::ChatChunk;

use serde_json::Value;

use crate::types::Author;

/// Separator placed between assistant fragments when they are flattened to text
pub const FRAGMENT_SEPARATOR: &str = "\n---\n";

/// Collect the text of every fragment of every `GLEAN_AI` message in a
/// Chat API payload, in order.
///
/// Entries that are not objects, or fragments without text, are skipped.
pub fn assistant_fragments(body: &Value) -> Vec<String> {
    let Some(messages) = body.get("messages").and_then(Value::as_array) else {
        return Vec::new();
    };

    messages
        .iter()
        .filter(|msg| msg.get("author").and_then(Value::as_str) == Some(Author::GleanAi.as_str()))
        .filter_map(|msg| msg.get("fragments").and_then(Value::as_array))
        .flatten()
        .filter_map(|fragment| fragment.get("text").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

/// Whether the payload contains at least one `GLEAN_AI` message
pub fn has_assistant_message(body: &Value) -> bool {
    body.get("messages")
        .and_then(Value::as_array)
        .is_some_and(|messages| {
            messages
                .iter()
                .any(|msg| msg.get("author").and_then(Value::as_str) == Some(Author::GleanAi.as_str()))
        })
}
