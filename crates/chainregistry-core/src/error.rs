//! Error types for the registry pipeline.

use thiserror::Error;

/// Errors that can occur while syncing or querying the identity index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The log source could not be reached or returned a transport error.
    #[error("log source unavailable: {0}")]
    SourceUnavailable(String),

    /// A log's topics/data did not match the expected event shape.
    #[error("decode error at block {block_number}: {reason}")]
    Decode { block_number: u64, reason: String },

    /// A query missed. This is a normal result, not a failure of the index.
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    /// Invalid registry configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The sync pass was cancelled at a window boundary.
    #[error("sync cancelled")]
    Cancelled,

    /// A scan task panicked or was aborted by the runtime.
    #[error("scan task failed: {0}")]
    Task(String),
}

impl RegistryError {
    pub fn not_found(kind: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            kind,
            key: key.to_string(),
        }
    }

    pub fn decode(block_number: u64, reason: impl Into<String>) -> Self {
        Self::Decode {
            block_number,
            reason: reason.into(),
        }
    }

    /// Returns `true` for a query miss.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if a later sync pass may succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SourceUnavailable(_) | Self::Task(_))
    }
}
