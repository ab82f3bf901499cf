pub mod chat;

pub use chat::ChatTool;

use glean_client::GleanError;
use serde_json::{json, Value};

use crate::protocol::{RpcError, INTERNAL_ERROR, INVALID_PARAMS, REQUEST_CANCELLED};

/// Callback receiving `(progress, message)` while a tool runs
pub type ProgressFn = Box<dyn Fn(u64, &str) + Send + Sync>;

/// Failed tool invocation, reported to the host as a JSON-RPC error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolError {
    #[error("{0}")]
    InvalidParams(String),

    #[error("{0}")]
    Internal(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl ToolError {
    pub fn code(&self) -> i32 {
        match self {
            ToolError::InvalidParams(_) => INVALID_PARAMS,
            ToolError::Internal(_) => INTERNAL_ERROR,
            ToolError::Cancelled => REQUEST_CANCELLED,
        }
    }

    pub fn to_rpc(&self) -> RpcError {
        RpcError::new(self.code(), self.to_string())
    }
}

impl From<GleanError> for ToolError {
    fn from(e: GleanError) -> Self {
        match e {
            GleanError::Validation(_) => ToolError::InvalidParams(e.to_string()),
            GleanError::Cancelled => ToolError::Cancelled,
            other => ToolError::Internal(other.to_string()),
        }
    }
}

/// Successful tool result
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub text: String,
    pub meta: Option<Value>,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    /// `tools/call` result payload
    pub fn into_result(self) -> Value {
        let mut result = json!({
            "content": [{ "type": "text", "text": self.text }],
            "isError": false,
        });
        if let Some(meta) = self.meta {
            result["_meta"] = meta;
        }
        result
    }
}
