//! Minimal block shape handed from the sync loop to the chain-state index.

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

use crate::quantity;

/// A block as observed from the node: header linkage plus transaction hashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedBlock {
    #[serde(with = "quantity::u64_hex")]
    pub number: u64,
    pub hash: B256,
    pub parent_hash: B256,
    #[serde(with = "quantity::u64_hex", default)]
    pub timestamp: u64,
    /// Transaction hashes in block order.
    #[serde(default)]
    pub transactions: Vec<B256>,
}

impl ObservedBlock {
    /// Returns `true` if `parent` is the direct parent of `self`.
    pub fn extends(&self, parent_number: u64, parent_hash: &B256) -> bool {
        self.number == parent_number + 1 && &self.parent_hash == parent_hash
    }
}
