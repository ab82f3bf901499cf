use glean_core::ValidationError;
use thiserror::Error;

/// Unified error type for Glean chat operations
#[derive(Error, Debug)]
pub enum GleanError {
    #[error("invalid chat request: {0}")]
    Validation(#[from] ValidationError),

    #[error("authentication error: {0}")]
    Authentication(String),

    #[error("{}", remote_message(*status, body))]
    RemoteService { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid response from Glean API: {0}")]
    Decode(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("config error: {0}")]
    Config(String),
}

fn remote_message(status: u16, body: &str) -> String {
    let prefix = match status {
        429 => format!("Glean API error: rate limit exceeded ({})", status),
        _ => format!("Glean API error: status {}", status),
    };
    if body.trim().is_empty() {
        prefix
    } else {
        format!("{} - {}", prefix, body.trim())
    }
}

impl GleanError {
    /// Chat sends may persist server-side, so nothing is retried
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// HTTP status reported by the remote service, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            GleanError::RemoteService { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GleanError::Transport("Request to Glean API timed out".to_string())
        } else if e.is_decode() {
            GleanError::Decode(e.to_string())
        } else {
            GleanError::Transport(format!("Failed to connect to Glean API: {}", e))
        }
    }
}

pub type Result<T> = std::result::Result<T, GleanError>;
