pub mod types;
pub mod chat;
pub mod error;

pub use types::{Author, ChatMessage, Fragment, MessageType};

pub use chat::{
    ChatRequest,
    ChatResponse,
    ChatChunk,
    FRAGMENT_SEPARATOR,
};

pub use error::ValidationError;
