use std::sync::Arc;

use futures::StreamExt;
use glean_client::{ChatProvider, ChatReply, ChatStream};
use glean_config::ChatDefaults;
use glean_core::{ChatMessage, ChatRequest, ChatResponse};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ProgressFn, ToolError, ToolOutput};

const EMPTY_RESPONSE: &str = "Empty response received from Glean Chat API";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatArgs {
    messages: Vec<ChatMessage>,
    #[serde(default)]
    save_chat: Option<bool>,
    #[serde(default)]
    stream: Option<bool>,
}

/// The `chat` tool: forwards a conversation to Glean's Chat API
pub struct ChatTool {
    provider: Arc<dyn ChatProvider>,
    defaults: ChatDefaults,
}

impl ChatTool {
    pub const NAME: &'static str = "chat";

    pub fn new(provider: Arc<dyn ChatProvider>, defaults: ChatDefaults) -> Self {
        Self { provider, defaults }
    }

    /// Entry for `tools/list`
    pub fn definition() -> Value {
        json!({
            "name": Self::NAME,
            "description": "Send a chat request to Glean's Chat API.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "messages": {
                        "type": "array",
                        "description": "List of messages in the conversation",
                        "minItems": 1,
                        "items": {
                            "type": "object",
                            "properties": {
                                "author": {
                                    "type": "string",
                                    "enum": ["USER", "GLEAN_AI"],
                                    "default": "USER"
                                },
                                "fragments": {
                                    "type": "array",
                                    "minItems": 1,
                                    "items": {
                                        "type": "object",
                                        "properties": { "text": { "type": "string" } },
                                        "required": ["text"]
                                    }
                                },
                                "messageType": {
                                    "type": "string",
                                    "default": "CONTENT"
                                }
                            },
                            "required": ["fragments"]
                        }
                    },
                    "saveChat": {
                        "type": "boolean",
                        "description": "Persist the exchange in Glean"
                    },
                    "stream": {
                        "type": "boolean",
                        "description": "Receive the answer incrementally"
                    }
                },
                "required": ["messages"]
            }
        })
    }

    /// Turn tool arguments into a validated request
    pub fn parse_request(&self, arguments: Value) -> Result<ChatRequest, ToolError> {
        let args: ChatArgs = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidParams(format!("Invalid chat arguments: {}", e)))?;

        let request = ChatRequest::new()
            .with_messages(args.messages)
            .save_chat(args.save_chat.unwrap_or(self.defaults.save_chat))
            .stream(args.stream.unwrap_or(self.defaults.stream));

        request
            .validate()
            .map_err(|e| ToolError::InvalidParams(format!("invalid chat request: {}", e)))?;
        Ok(request)
    }

    /// Run the tool. Stream chunks are reported through `progress` as they arrive.
    pub async fn call(&self, arguments: Value, progress: Option<ProgressFn>) -> Result<ToolOutput, ToolError> {
        let request = self.parse_request(arguments)?;
        let saved = request.save_chat;

        match self.provider.send(request).await? {
            ChatReply::Complete(response) => render_response(&response),
            ChatReply::Stream(stream) => collect_stream(stream, saved, progress).await,
        }
    }
}

/// Text for a complete response: assistant fragments, else the `content`
/// string, else the raw body
fn render_response(response: &ChatResponse) -> Result<ToolOutput, ToolError> {
    if response.is_empty() {
        return Err(ToolError::Internal(EMPTY_RESPONSE.to_string()));
    }

    let text = match (response.assistant_text(), response.content()) {
        (Some(text), _) => text,
        (None, Some(content)) => content.to_string(),
        (None, None) => {
            tracing::debug!("No assistant message in Glean response, passing body through");
            response.body.to_string()
        }
    };

    Ok(ToolOutput::text(text).with_meta(json!({
        "saved": response.saved,
        "chatId": response.chat_id(),
    })))
}

async fn collect_stream(
    mut stream: ChatStream,
    saved: bool,
    progress: Option<ProgressFn>,
) -> Result<ToolOutput, ToolError> {
    let mut text = String::new();
    let mut chat_id = None;
    let mut last_body = None;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let delta = chunk.text();
        if let Some(report) = &progress {
            report(chunk.index as u64 + 1, &delta);
        }
        text.push_str(&delta);
        if let Some(id) = chunk.chat_id() {
            chat_id = Some(id.to_string());
        }
        last_body = Some(chunk.body);
    }

    let Some(last_body) = last_body else {
        return Err(ToolError::Internal(EMPTY_RESPONSE.to_string()));
    };
    if text.is_empty() {
        text = last_body.to_string();
    }

    Ok(ToolOutput::text(text).with_meta(json!({
        "saved": saved,
        "chatId": chat_id,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use glean_client::{GleanError, Result};
    use glean_core::ChatChunk;
    use std::sync::Mutex;

    struct FixedProvider {
        body: Value,
        chunks: Vec<Value>,
        seen: Mutex<Vec<ChatRequest>>,
    }

    impl FixedProvider {
        fn new(body: Value, chunks: Vec<Value>) -> Arc<Self> {
            Arc::new(Self {
                body,
                chunks,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatProvider for FixedProvider {
        async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
            let saved = request.save_chat;
            self.seen.lock().unwrap().push(request);
            Ok(ChatResponse::new(self.body.clone(), saved))
        }

        async fn chat_stream(&self, request: ChatRequest) -> Result<ChatStream> {
            self.seen.lock().unwrap().push(request);
            let chunks: Vec<Result<ChatChunk>> = self
                .chunks
                .iter()
                .cloned()
                .enumerate()
                .map(|(i, body)| Ok(ChatChunk::new(i, body)))
                .collect();
            Ok(Box::pin(futures::stream::iter(chunks)))
        }
    }

    fn ai(text: &str) -> Value {
        json!({ "messages": [{ "author": "GLEAN_AI", "fragments": [{ "text": text }] }] })
    }

    fn user_args(extra: Value) -> Value {
        let mut args = json!({ "messages": [{ "fragments": [{ "text": "hi" }] }] });
        if let (Some(args), Some(extra)) = (args.as_object_mut(), extra.as_object()) {
            args.extend(extra.clone());
        }
        args
    }

    #[tokio::test]
    async fn test_defaults_applied() {
        let provider = FixedProvider::new(ai("hello"), vec![]);
        let tool = ChatTool::new(provider.clone(), ChatDefaults::default());

        let output = tool.call(user_args(json!({})), None).await.unwrap();

        assert_eq!(output.text, "hello");
        let seen = provider.seen.lock().unwrap();
        assert!(seen[0].save_chat);
        assert!(!seen[0].stream);
    }

    #[tokio::test]
    async fn test_assistant_fragments_joined() {
        let body = json!({
            "chatId": "c-1",
            "messages": [
                { "author": "USER", "fragments": [{ "text": "hi" }] },
                { "author": "GLEAN_AI", "fragments": [{ "text": "first" }] },
                { "author": "GLEAN_AI", "fragments": [{ "text": "second" }] }
            ]
        });
        let tool = ChatTool::new(FixedProvider::new(body, vec![]), ChatDefaults::default());

        let output = tool.call(user_args(json!({ "saveChat": false })), None).await.unwrap();

        assert_eq!(output.text, "first\n---\nsecond");
        assert_eq!(output.meta, Some(json!({ "saved": false, "chatId": "c-1" })));
    }

    #[tokio::test]
    async fn test_content_and_passthrough_fallbacks() {
        let tool = ChatTool::new(FixedProvider::new(json!({ "content": "plain" }), vec![]), ChatDefaults::default());
        assert_eq!(tool.call(user_args(json!({})), None).await.unwrap().text, "plain");

        let tool = ChatTool::new(FixedProvider::new(json!({ "response": "X" }), vec![]), ChatDefaults::default());
        assert_eq!(tool.call(user_args(json!({})), None).await.unwrap().text, r#"{"response":"X"}"#);
    }

    #[tokio::test]
    async fn test_empty_response_is_error() {
        let tool = ChatTool::new(FixedProvider::new(json!({}), vec![]), ChatDefaults::default());
        let err = tool.call(user_args(json!({})), None).await.unwrap_err();
        assert_eq!(err, ToolError::Internal(EMPTY_RESPONSE.to_string()));
    }

    #[tokio::test]
    async fn test_invalid_arguments() {
        let provider = FixedProvider::new(ai("unused"), vec![]);
        let tool = ChatTool::new(provider.clone(), ChatDefaults::default());

        let err = tool.call(json!({ "messages": [] }), None).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams(ref msg) if msg.contains("must not be empty")));

        let err = tool.call(json!({ "saveChat": true }), None).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams(_)));

        assert!(provider.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stream_reports_progress() {
        let chunks = vec![ai("Hel"), ai("lo"), json!({ "chatId": "c-2" })];
        let provider = FixedProvider::new(json!({}), chunks);
        let tool = ChatTool::new(provider.clone(), ChatDefaults::default());

        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = reports.clone();
        let progress: ProgressFn = Box::new(move |step, text| {
            sink.lock().unwrap().push((step, text.to_string()));
        });

        let output = tool
            .call(user_args(json!({ "stream": true })), Some(progress))
            .await
            .unwrap();

        assert_eq!(output.text, "Hello");
        assert_eq!(output.meta, Some(json!({ "saved": true, "chatId": "c-2" })));
        assert_eq!(
            *reports.lock().unwrap(),
            vec![(1, "Hel".to_string()), (2, "lo".to_string()), (3, String::new())]
        );
        assert!(provider.seen.lock().unwrap()[0].stream);
    }

    #[tokio::test]
    async fn test_empty_stream_is_error() {
        let tool = ChatTool::new(FixedProvider::new(json!({}), vec![]), ChatDefaults { save_chat: true, stream: true });
        let err = tool.call(user_args(json!({})), None).await.unwrap_err();
        assert_eq!(err, ToolError::Internal(EMPTY_RESPONSE.to_string()));
    }

    #[test]
    fn test_provider_error_mapping() {
        let err: ToolError = GleanError::RemoteService { status: 500, body: String::new() }.into();
        assert_eq!(err.code(), crate::protocol::INTERNAL_ERROR);
    }
}
