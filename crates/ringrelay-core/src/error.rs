//! Error types for signing and signature recovery.

use alloy_primitives::Address;
use thiserror::Error;

/// Errors raised while producing or checking a secp256k1 signature.
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("No signing key available for account {address}")]
    UnknownAccount { address: Address },

    #[error("Invalid private key: {reason}")]
    InvalidKey { reason: String },

    #[error("Signing failed: {reason}")]
    Failed { reason: String },

    #[error("Invalid signature values (v = {v})")]
    InvalidSignature { v: u8 },

    #[error("Public key recovery failed: {reason}")]
    Recovery { reason: String },

    #[error("Ring has not been signed")]
    Unsigned,
}

impl SigningError {
    /// Returns `true` if the error means the key is simply not held locally.
    pub fn is_unknown_account(&self) -> bool {
        matches!(self, Self::UnknownAccount { .. })
    }
}
