pub mod message;

pub use message::{Author, ChatMessage, Fragment, MessageType};
