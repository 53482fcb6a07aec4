//! Transport-level error types.

use thiserror::Error;

use chainregistry_core::error::RegistryError;

use crate::request::JsonRpcError;

/// Errors that can occur while talking to a JSON-RPC node.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed (connection refused, timeout, non-2xx status).
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON-RPC error object returned by the node.
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    /// Response body or result could not be deserialized.
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The result deserialized but its contents are unusable.
    #[error("Invalid response to {method}: {reason}")]
    InvalidResponse { method: String, reason: String },
}

impl From<TransportError> for RegistryError {
    fn from(e: TransportError) -> Self {
        RegistryError::SourceUnavailable(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_surface_as_source_unavailable() {
        let err: RegistryError = TransportError::Rpc(JsonRpcError {
            code: -32005,
            message: "query returned more than 10000 results".into(),
            data: None,
        })
        .into();
        assert!(matches!(err, RegistryError::SourceUnavailable(ref m) if m.contains("-32005")));
    }
}
