//! Fork detection against the index, and the single-writer block recorder.
//!
//! An incoming block is classified by looking up its parent:
//! 1. **Cold start**: nothing recorded yet
//! 2. **Canonical**: the parent is the head (or the block fills a gap above it)
//! 3. **Fork**: the nearest ancestor on the head's chain is below the cursor.
//!    The walk covers parents on a branch the head has left as well as
//!    headers only the node knows.
//!
//! The index never deletes anything. A fork yields a [`RollbackRange`] for the
//! [`Reconciler`]s to invalidate dependent records.

use std::fmt;
use std::sync::Arc;

use alloy_primitives::B256;
use async_trait::async_trait;
use ringrelay_core::ObservedBlock;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::error::IndexError;
use crate::index::{BlockIndex, ChainStateIndex};

// ─── Types ────────────────────────────────────────────────────────────────────

/// Half-open block range `(after, through]` invalidated by a fork.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollbackRange {
    /// Number of the common ancestor; kept.
    pub after: u64,
    /// Highest number previously recorded; dropped.
    pub through: u64,
}

impl RollbackRange {
    pub fn contains(&self, number: u64) -> bool {
        number > self.after && number <= self.through
    }

    pub fn depth(&self) -> u64 {
        self.through.saturating_sub(self.after)
    }

    pub fn is_empty(&self) -> bool {
        self.depth() == 0
    }
}

impl fmt::Display for RollbackRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}]", self.after, self.through)
    }
}

/// Result of checking a block against the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForkStatus {
    ColdStart,
    Canonical,
    Fork {
        /// Common ancestor, or `None` when none was found within the walk depth.
        ancestor: Option<BlockIndex>,
        rollback: RollbackRange,
    },
}

impl ForkStatus {
    pub fn is_fork(&self) -> bool {
        matches!(self, Self::Fork { .. })
    }
}

/// Header lookups against the node, used to walk back to a common ancestor.
#[async_trait]
pub trait BlockSource: Send + Sync {
    async fn block_by_hash(&self, hash: &B256) -> Result<Option<BlockIndex>, IndexError>;
}

/// Invalidates records that depend on blocks dropped by a fork.
#[async_trait]
pub trait Reconciler: Send + Sync {
    async fn roll_back(&self, range: RollbackRange) -> Result<(), IndexError>;
}

// ─── Fork check ───────────────────────────────────────────────────────────────

impl ChainStateIndex {
    /// Classify `block` against what the index has recorded.
    pub async fn check_parent(
        &self,
        block: &ObservedBlock,
        source: &dyn BlockSource,
    ) -> Result<ForkStatus, IndexError> {
        let cursor = match self.get_block_number().await {
            Ok(n) => n,
            Err(IndexError::NotFound { .. }) => return Ok(ForkStatus::ColdStart),
            Err(e @ IndexError::Corruption { .. }) => {
                warn!(error = %e, "unreadable block cursor; treating as cold start");
                return Ok(ForkStatus::ColdStart);
            }
            Err(e) => return Err(e),
        };

        let ancestor = self.find_ancestor(block, cursor, source).await?;
        Ok(classify(block, cursor, ancestor, self.config().max_reorg_depth))
    }

    /// Walk back from `block`'s parent to the nearest header on the head's
    /// chain, reading the index first and the node for headers never indexed.
    /// Indexed headers on a branch the head has left are walked past.
    async fn find_ancestor(
        &self,
        block: &ObservedBlock,
        cursor: u64,
        source: &dyn BlockSource,
    ) -> Result<Option<BlockIndex>, IndexError> {
        let mut hash = block.parent_hash;
        for step in 0..=self.config().max_reorg_depth {
            let header = match self.get_block_index(&hash).await {
                Ok(header) => header,
                Err(IndexError::NotFound { .. }) => {
                    source.block_by_hash(&hash).await?.ok_or_else(|| IndexError::Source {
                        reason: format!("node does not know block {hash}"),
                    })?
                }
                Err(e) => return Err(e),
            };
            if step == 0 && header.number + 1 != block.number {
                warn!(
                    number = block.number,
                    parent_number = header.number,
                    "parent number does not precede block"
                );
            }
            if self.is_canonical(&header, cursor).await? {
                return Ok(Some(header));
            }
            if header.number == 0 {
                break;
            }
            hash = header.parent_hash;
        }
        Ok(None)
    }
}

fn classify(block: &ObservedBlock, cursor: u64, ancestor: Option<BlockIndex>, max_depth: u64) -> ForkStatus {
    match ancestor {
        Some(anc) if anc.number >= cursor => {
            if anc.number + 1 < block.number {
                warn!(
                    from = anc.number + 1,
                    to = block.number - 1,
                    "blocks between cursor and head were never recorded"
                );
            }
            ForkStatus::Canonical
        }
        Some(anc) => {
            let rollback = RollbackRange { after: anc.number, through: cursor };
            warn!(
                at = block.number,
                ancestor = anc.number,
                depth = rollback.depth(),
                "Fork detected"
            );
            ForkStatus::Fork { ancestor: Some(anc), rollback }
        }
        None => {
            let rollback = RollbackRange { after: cursor.saturating_sub(max_depth), through: cursor };
            warn!(at = block.number, cursor, "Fork detected; no common ancestor within walk depth");
            ForkStatus::Fork { ancestor: None, rollback }
        }
    }
}

// ─── Recorder ─────────────────────────────────────────────────────────────────

/// Single writer for one chain: fork check → reconcile → save block → save transactions.
pub struct BlockRecorder {
    index: ChainStateIndex,
    source: Arc<dyn BlockSource>,
    reconcilers: Vec<Arc<dyn Reconciler>>,
}

impl BlockRecorder {
    pub fn new(index: ChainStateIndex, source: Arc<dyn BlockSource>) -> Self {
        Self { index, source, reconcilers: Vec::new() }
    }

    pub fn with_reconciler(mut self, reconciler: Arc<dyn Reconciler>) -> Self {
        self.reconcilers.push(reconciler);
        self
    }

    pub fn index(&self) -> &ChainStateIndex {
        &self.index
    }

    /// Record one block. Takes `&mut self` so a recorder cannot be shared
    /// between concurrent writers.
    pub async fn record(&mut self, block: &ObservedBlock) -> Result<ForkStatus, IndexError> {
        let status = self.index.check_parent(block, self.source.as_ref()).await?;

        if let ForkStatus::Fork { rollback, .. } = &status {
            if !rollback.is_empty() {
                for reconciler in &self.reconcilers {
                    reconciler.roll_back(*rollback).await?;
                }
            }
        }

        self.index.save_block(block).await?;
        self.index.save_transactions(&block.hash, &block.transactions).await?;
        debug!(number = block.number, txs = block.transactions.len(), "recorded block");
        Ok(status)
    }

    /// Record blocks from `rx` in arrival order until the sender closes.
    ///
    /// A block that fails to record is logged and skipped.
    pub async fn run(mut self, mut rx: mpsc::Receiver<ObservedBlock>) -> u64 {
        let mut recorded = 0u64;
        while let Some(block) = rx.recv().await {
            match self.record(&block).await {
                Ok(_) => recorded += 1,
                Err(e) => error!(number = block.number, hash = %block.hash, error = %e, "failed to record block"),
            }
        }
        info!(recorded, "block recorder stopped");
        recorded
    }
}
