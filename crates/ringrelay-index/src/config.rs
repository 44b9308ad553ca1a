//! Index configuration.

use serde::{Deserialize, Serialize};

/// Settings for [`ChainStateIndex`](crate::ChainStateIndex) and
/// [`BlockRecorder`](crate::BlockRecorder).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Cursor value assumed when nothing has been recorded yet.
    #[serde(default)]
    pub default_block_number: u64,
    /// How many ancestors the fork check walks before giving up on finding
    /// a common ancestor.
    #[serde(default = "default_max_reorg_depth")]
    pub max_reorg_depth: u64,
}

fn default_max_reorg_depth() -> u64 {
    64
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { default_block_number: 0, max_reorg_depth: default_max_reorg_depth() }
    }
}
