//! MCP server for Glean's Chat API.
//!
//! Exposes a single `chat` tool over JSON-RPC 2.0 on stdio.

pub mod protocol;
pub mod server;
pub mod tools;

pub use server::{McpServer, SERVER_NAME};
pub use tools::{ChatTool, ToolError, ToolOutput};
