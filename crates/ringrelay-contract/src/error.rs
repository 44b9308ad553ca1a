//! Error types for contract binding and interaction.

use ringrelay_core::SigningError;
use ringrelay_rpc::TransportError;
use thiserror::Error;

/// Raised while building the descriptor table from an ABI document.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("Invalid ABI JSON: {reason}")]
    InvalidAbi { reason: String },

    #[error("Method '{name}' not found in ABI")]
    MissingMethod { name: String },

    #[error("Event '{name}' not found in ABI")]
    MissingEvent { name: String },

    #[error("Cannot resolve parameter types of '{item}': {reason}")]
    UnresolvableType { item: String, reason: String },
}

/// Errors from call, send, and event-watch operations.
#[derive(Debug, Error)]
pub enum ContractError {
    #[error(transparent)]
    Bind(#[from] BindError),

    /// Arguments could not be packed. No request was sent.
    #[error("Encoding error: {reason}")]
    Encoding { reason: String },

    /// A result or log could not be unpacked.
    #[error("Decoding error: {reason}")]
    Decoding { reason: String },

    /// Caller-supplied gas parameters were rejected.
    #[error("Invalid gas parameter: {reason}")]
    InvalidGas { reason: String },

    #[error(transparent)]
    Node(#[from] TransportError),

    #[error(transparent)]
    Signing(#[from] SigningError),
}

impl ContractError {
    pub(crate) fn encoding(reason: impl Into<String>) -> Self {
        Self::Encoding { reason: reason.into() }
    }

    pub(crate) fn decoding(reason: impl Into<String>) -> Self {
        Self::Decoding { reason: reason.into() }
    }

    /// Returns `true` if the error came from the node rather than local processing.
    pub fn is_node_error(&self) -> bool {
        matches!(self, Self::Node(_))
    }
}
