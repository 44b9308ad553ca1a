//! Node communication errors.

use thiserror::Error;

use crate::request::JsonRpcError;

/// Errors raised while talking to the blockchain node.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed (connection refused, non-2xx status, etc.).
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON-RPC error object returned by the node.
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    /// Request timed out after the configured duration.
    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// Response body or result could not be deserialized.
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// Request could not be built from the given inputs.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },
}

impl TransportError {
    /// Returns `true` if the node executed the request and reported an error.
    pub fn is_execution_error(&self) -> bool {
        matches!(self, Self::Rpc(_))
    }
}
