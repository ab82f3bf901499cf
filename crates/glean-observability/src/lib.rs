//! Observability for the Glean MCP server
//!
//! Structured logging on stderr, plus the spans used around tool calls.

pub mod config;
pub mod error;
pub mod logging;

pub use config::LoggingConfig;
pub use error::{ObservabilityError, Result};
pub use logging::{build_filter, init_logging, request_span};
