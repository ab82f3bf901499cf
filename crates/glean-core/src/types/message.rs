use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Author {
    #[default]
    User,
    GleanAi,
}

impl Author {
    /// Wire name of the author
    pub fn as_str(&self) -> &'static str {
        match self {
            Author::User => "USER",
            Author::GleanAi => "GLEAN_AI",
        }
    }
}

impl std::fmt::Display for Author {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of message carried in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    #[default]
    Content,
    Context,
    Debug,
    Error,
    Heading,
    Warning,
}

/// A text fragment in a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub text: String,
}

impl Fragment {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(default)]
    pub author: Author,
    pub fragments: Vec<Fragment>,
    #[serde(default)]
    pub message_type: MessageType,
}

impl ChatMessage {
    /// Create a message from its parts
    pub fn new(author: Author, fragments: Vec<Fragment>) -> Self {
        Self {
            author,
            fragments,
            message_type: MessageType::Content,
        }
    }

    /// Create a user message holding a single text fragment
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Author::User, vec![Fragment::text(text)])
    }

    /// Concatenated fragment text
    pub fn text(&self) -> String {
        self.fragments
            .iter()
            .map(|f| f.text.as_str())
            .collect::<Vec<_>>()
            .join("")
    }

    /// Check that the message carries at least one fragment and no blank ones.
    ///
    /// `index` is the position of the message in its request, used for the error.
    pub fn validate(&self, index: usize) -> Result<(), ValidationError> {
        if self.fragments.is_empty() {
            return Err(ValidationError::NoFragments { index });
        }
        if let Some(fragment) = self.fragments.iter().position(|f| f.text.trim().is_empty()) {
            return Err(ValidationError::EmptyFragment { index, fragment });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_message_wire_format() {
        let msg = ChatMessage::user("What is Glean?");
        let value = serde_json::to_value(&msg).unwrap();

        assert_eq!(
            value,
            json!({
                "author": "USER",
                "fragments": [{ "text": "What is Glean?" }],
                "messageType": "CONTENT"
            })
        );
    }

    #[test]
    fn test_defaults_when_fields_omitted() {
        let msg: ChatMessage = serde_json::from_value(json!({
            "fragments": [{ "text": "hi" }]
        }))
        .unwrap();

        assert_eq!(msg.author, Author::User);
        assert_eq!(msg.message_type, MessageType::Content);
    }

    #[test]
    fn test_glean_ai_author() {
        let msg: ChatMessage = serde_json::from_value(json!({
            "author": "GLEAN_AI",
            "fragments": [{ "text": "a" }, { "text": "b" }],
            "messageType": "CONTENT"
        }))
        .unwrap();

        assert_eq!(msg.author, Author::GleanAi);
        assert_eq!(msg.text(), "ab");
        assert_eq!(msg.author.to_string(), "GLEAN_AI");
    }

    #[test]
    fn test_validate_rejects_blank_fragment() {
        let msg = ChatMessage::new(
            Author::User,
            vec![Fragment::text("ok"), Fragment::text("   ")],
        );

        assert_eq!(
            msg.validate(2),
            Err(ValidationError::EmptyFragment { index: 2, fragment: 1 })
        );
    }

    #[test]
    fn test_validate_rejects_no_fragments() {
        let msg = ChatMessage::new(Author::User, vec![]);
        assert_eq!(msg.validate(0), Err(ValidationError::NoFragments { index: 0 }));
    }
}
