use thiserror::Error;

/// Malformed request shape, detected before any network call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("messages must not be empty")]
    NoMessages,

    #[error("message {index} has no fragments")]
    NoFragments { index: usize },

    #[error("message {index} fragment {fragment} has empty text")]
    EmptyFragment { index: usize, fragment: usize },
}
