//! Error types for order admission.

use alloy_primitives::{Address, B256, U256};
use thiserror::Error;

/// Why the filter chain refused an order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("malformed {field}: {reason}")]
    Malformed { field: &'static str, reason: String },

    #[error("tokenS and tokenB are both {token}")]
    SameToken { token: Address },

    #[error("fee {fee} does not exceed minimum {min}")]
    FeeTooLow { fee: U256, min: U256 },

    #[error("signature cannot be recovered: {reason}")]
    BadSignature { reason: String },

    #[error("owner {owner} does not match signer {signer}")]
    SignerMismatch { owner: Address, signer: Address },

    #[error("token {token} is not in the allow list")]
    TokenNotAllowed { token: Address },

    #[error("token {token} is denied")]
    TokenDenied { token: Address },
}

impl Rejection {
    /// Name of the filter that produced this rejection.
    pub fn filter(&self) -> &'static str {
        match self {
            Self::Malformed { .. } | Self::SameToken { .. } | Self::FeeTooLow { .. } => "structural",
            Self::BadSignature { .. } | Self::SignerMismatch { .. } => "signature",
            Self::TokenNotAllowed { .. } | Self::TokenDenied { .. } => "token",
        }
    }
}

/// Errors returned by [`Gateway::ingest`](crate::Gateway::ingest).
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Order rejected by {filter} filter: {0}", filter = .0.filter())]
    Validation(#[from] Rejection),

    #[error("Order {hash} already exists")]
    Duplicate { hash: B256 },

    #[error("Order store error: {reason}")]
    Store { reason: String },

    #[error("Publish failed: {reason}")]
    Publish { reason: String },
}

impl GatewayError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Validation(r) => Some(r),
            _ => None,
        }
    }
}
