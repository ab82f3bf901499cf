use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use glean_client::{ChatProvider, ChatStream, GleanError, Result};
use glean_config::ChatDefaults;
use glean_core::{ChatChunk, ChatRequest, ChatResponse};
use glean_mcp::protocol::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR, REQUEST_CANCELLED,
};
use glean_mcp::McpServer;
use serde_json::{json, Value};

/// Mock provider answering every request the same way
struct MockProvider {
    reply: MockReply,
    calls: AtomicUsize,
}

enum MockReply {
    Text(&'static str),
    Chunks(Vec<&'static str>),
    Unauthorized,
    Hang,
}

impl MockProvider {
    fn new(reply: MockReply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
        })
    }
}

fn ai(text: &str) -> Value {
    json!({ "messages": [{ "author": "GLEAN_AI", "fragments": [{ "text": text }] }] })
}

#[async_trait]
impl ChatProvider for MockProvider {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            MockReply::Text(text) => Ok(ChatResponse::new(ai(text), request.save_chat)),
            MockReply::Unauthorized => Err(GleanError::Authentication("Invalid Glean API key".into())),
            MockReply::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(ChatResponse::new(ai("too late"), request.save_chat))
            }
            MockReply::Chunks(_) => panic!("unexpected non-streaming call"),
        }
    }

    async fn chat_stream(&self, _request: ChatRequest) -> Result<ChatStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let MockReply::Chunks(parts) = &self.reply else {
            panic!("unexpected streaming call");
        };
        let chunks: Vec<Result<ChatChunk>> = parts
            .iter()
            .enumerate()
            .map(|(i, text)| Ok(ChatChunk::new(i, ai(text))))
            .collect();
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}

/// Feed `frames` to a server backed by `provider`, return every output line
async fn run(provider: Arc<MockProvider>, frames: &[Value]) -> Vec<Value> {
    let input: String = frames.iter().map(|f| format!("{}\n", f)).collect();
    run_raw(provider, input.as_bytes()).await
}

async fn run_raw(provider: Arc<MockProvider>, input: &[u8]) -> Vec<Value> {
    let server = McpServer::new(provider, ChatDefaults::default());
    let output = server.serve(input, Vec::new()).await.unwrap();

    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn response_for<'a>(frames: &'a [Value], id: i64) -> &'a Value {
    frames
        .iter()
        .find(|f| f.get("id") == Some(&json!(id)))
        .unwrap_or_else(|| panic!("no response for id {}", id))
}

fn chat_call(id: i64, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": "chat", "arguments": arguments }
    })
}

fn hello_args() -> Value {
    json!({ "messages": [{ "author": "USER", "fragments": [{ "text": "Hello" }], "messageType": "CONTENT" }] })
}

#[tokio::test]
async fn test_initialize_and_list_tools() {
    let frames = run(
        MockProvider::new(MockReply::Text("unused")),
        &[
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
            json!({"jsonrpc": "2.0", "id": 3, "method": "ping"}),
        ],
    )
    .await;

    assert_eq!(frames.len(), 3);

    let init = &response_for(&frames, 1)["result"];
    assert_eq!(init["protocolVersion"], "2024-11-05");
    assert_eq!(init["serverInfo"]["name"], "mcp-glean");
    assert!(init["capabilities"]["tools"].is_object());

    let tools = response_for(&frames, 2)["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0]["name"], "chat");
    assert_eq!(tools[0]["inputSchema"]["required"], json!(["messages"]));

    assert_eq!(response_for(&frames, 3)["result"], json!({}));
}

#[tokio::test]
async fn test_chat_call_returns_assistant_text() {
    let provider = MockProvider::new(MockReply::Text("Glean says hi"));
    let frames = run(provider.clone(), &[chat_call(5, hello_args())]).await;

    let result = &response_for(&frames, 5)["result"];
    assert_eq!(result["content"][0]["type"], "text");
    assert_eq!(result["content"][0]["text"], "Glean says hi");
    assert_eq!(result["isError"], false);
    assert_eq!(result["_meta"]["saved"], true);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_empty_messages_never_reach_provider() {
    let provider = MockProvider::new(MockReply::Text("unused"));
    let frames = run(provider.clone(), &[chat_call(6, json!({ "messages": [] }))]).await;

    assert_eq!(response_for(&frames, 6)["error"]["code"], INVALID_PARAMS);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_provider_error_surfaces_as_internal_error() {
    let frames = run(MockProvider::new(MockReply::Unauthorized), &[chat_call(7, hello_args())]).await;

    let error = &response_for(&frames, 7)["error"];
    assert_eq!(error["code"], INTERNAL_ERROR);
    assert!(error["message"].as_str().unwrap().contains("Invalid Glean API key"));
}

#[tokio::test]
async fn test_streamed_call_sends_progress() {
    let provider = MockProvider::new(MockReply::Chunks(vec!["a", "b", "c"]));
    let mut call = chat_call(8, json!({ "messages": [{ "fragments": [{ "text": "q" }] }], "stream": true }));
    call["params"]["_meta"] = json!({ "progressToken": "p-8" });

    let frames = run(provider, &[call]).await;

    let progress: Vec<&Value> = frames
        .iter()
        .filter(|f| f["method"] == "notifications/progress")
        .collect();
    assert_eq!(progress.len(), 3);
    let steps: Vec<i64> = progress.iter().map(|f| f["params"]["progress"].as_i64().unwrap()).collect();
    assert_eq!(steps, vec![1, 2, 3]);
    assert!(progress.iter().all(|f| f["params"]["progressToken"] == "p-8"));

    assert_eq!(response_for(&frames, 8)["result"]["content"][0]["text"], "abc");
}

#[tokio::test]
async fn test_cancelled_call_reports_cancellation() {
    let frames = run(
        MockProvider::new(MockReply::Hang),
        &[
            chat_call(9, hello_args()),
            json!({
                "jsonrpc": "2.0",
                "method": "notifications/cancelled",
                "params": { "requestId": 9, "reason": "user aborted" }
            }),
        ],
    )
    .await;

    assert_eq!(frames.len(), 1);
    assert_eq!(response_for(&frames, 9)["error"]["code"], REQUEST_CANCELLED);
}

#[tokio::test]
async fn test_unknown_tool_and_method() {
    let frames = run(
        MockProvider::new(MockReply::Text("unused")),
        &[
            json!({"jsonrpc": "2.0", "id": 10, "method": "tools/call", "params": {"name": "search", "arguments": {}}}),
            json!({"jsonrpc": "2.0", "id": 11, "method": "resources/list"}),
            json!({"jsonrpc": "2.0", "method": "notifications/unknown"}),
        ],
    )
    .await;

    assert_eq!(frames.len(), 2);
    assert_eq!(response_for(&frames, 10)["error"]["code"], INVALID_PARAMS);
    assert_eq!(response_for(&frames, 11)["error"]["code"], METHOD_NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_frames() {
    let input = "this is not json\n\n{\"jsonrpc\":\"1.0\",\"id\":12,\"method\":\"ping\"}\n{\"id\":13}\n";
    let frames = run_raw(MockProvider::new(MockReply::Text("unused")), input.as_bytes()).await;

    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0]["error"]["code"], PARSE_ERROR);
    assert_eq!(frames[0]["id"], Value::Null);
    assert_eq!(response_for(&frames, 12)["error"]["code"], INVALID_REQUEST);
    assert_eq!(response_for(&frames, 13)["error"]["code"], INVALID_REQUEST);
}

#[tokio::test]
async fn test_invalid_utf8_line_does_not_stop_server() {
    let mut input = Vec::new();
    input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n");
    input.extend_from_slice(b"\xff\xfe\n");
    input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":3,\"method\":\"ping\"}\n");

    let frames = run_raw(MockProvider::new(MockReply::Text("unused")), &input).await;

    assert_eq!(frames.len(), 3);
    assert_eq!(response_for(&frames, 1)["result"], json!({}));
    assert_eq!(frames[1]["error"]["code"], PARSE_ERROR);
    assert_eq!(frames[1]["id"], Value::Null);
    assert_eq!(response_for(&frames, 3)["result"], json!({}));
}

#[tokio::test]
async fn test_duplicate_in_flight_id_rejected() {
    let provider = MockProvider::new(MockReply::Hang);
    let frames = run(
        provider.clone(),
        &[
            chat_call(30, hello_args()),
            chat_call(30, hello_args()),
            json!({
                "jsonrpc": "2.0",
                "method": "notifications/cancelled",
                "params": { "requestId": 30 }
            }),
        ],
    )
    .await;

    let codes: Vec<i64> = frames
        .iter()
        .filter(|f| f["id"] == json!(30))
        .map(|f| f["error"]["code"].as_i64().unwrap())
        .collect();
    assert_eq!(codes, vec![INVALID_REQUEST as i64, REQUEST_CANCELLED as i64]);
    assert!(provider.calls.load(Ordering::SeqCst) <= 1);
}

#[tokio::test]
async fn test_concurrent_calls_all_answered() {
    let provider = MockProvider::new(MockReply::Text("ok"));
    let calls: Vec<Value> = (20..25).map(|id| chat_call(id, hello_args())).collect();

    let frames = run(provider.clone(), &calls).await;

    assert_eq!(frames.len(), 5);
    for id in 20..25 {
        assert_eq!(response_for(&frames, id)["result"]["content"][0]["text"], "ok");
    }
    assert_eq!(provider.calls.load(Ordering::SeqCst), 5);
}
