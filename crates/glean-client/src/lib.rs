pub mod auth;
pub mod error;
pub mod provider;
pub mod proxy;
pub mod stream;

// Re-export core types
pub use error::{GleanError, Result};
pub use auth::{Authenticator, ApiKeyAuth, MissingCredentials};
pub use provider::{ChatProvider, ChatReply};
pub use proxy::{GleanChatProxy, CHAT_RESOURCE};
pub use stream::{decode_ndjson, ChatStream};
