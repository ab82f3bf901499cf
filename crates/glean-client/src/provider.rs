use async_trait::async_trait;
use glean_core::{ChatRequest, ChatResponse};

use crate::error::Result;
use crate::stream::ChatStream;

/// Outcome of [`ChatProvider::send`]
pub enum ChatReply {
    /// Full response, returned once the body has arrived
    Complete(ChatResponse),
    /// Incremental chunks, delivered as they arrive
    Stream(ChatStream),
}

impl std::fmt::Debug for ChatReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatReply::Complete(response) => f.debug_tuple("Complete").field(response).finish(),
            ChatReply::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Chat backend seam; the MCP tool only talks to this trait
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send a request and wait for the complete response
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;

    /// Send a request and receive the response incrementally
    async fn chat_stream(&self, request: ChatRequest) -> Result<ChatStream>;

    /// Send a request, streaming or not according to `request.stream`
    async fn send(&self, request: ChatRequest) -> Result<ChatReply> {
        if request.stream {
            self.chat_stream(request).await.map(ChatReply::Stream)
        } else {
            self.chat(request).await.map(ChatReply::Complete)
        }
    }
}
