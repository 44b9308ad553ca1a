//! Error types for the chain-state index.

use thiserror::Error;

/// Errors raised by index lookups and writes.
///
/// `NotFound` (key absent) and `Corruption` (value present but undecodable)
/// are kept apart: callers use `NotFound` to detect cold start and fork gaps.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Key not found: {key}")]
    NotFound { key: String },

    #[error("Corrupt value under {key}: {reason}")]
    Corruption { key: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Block source error: {reason}")]
    Source { reason: String },

    #[error("Reconciliation failed: {reason}")]
    Reconcile { reason: String },
}

impl IndexError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::Corruption { .. })
    }
}
