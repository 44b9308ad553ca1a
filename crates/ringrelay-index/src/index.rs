//! The chain-state index: cursor, block headers, and per-block transaction sets.

use std::sync::Arc;

use alloy_primitives::B256;
use ringrelay_core::{quantity, ObservedBlock};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::IndexConfig;
use crate::error::IndexError;
use crate::kv::{display_key, KvStore, Table};

// ─── Records ──────────────────────────────────────────────────────────────────

/// Header record stored under the block's hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockIndex {
    #[serde(with = "quantity::u64_hex")]
    pub number: u64,
    pub hash: B256,
    pub parent_hash: B256,
}

impl From<&ObservedBlock> for BlockIndex {
    fn from(block: &ObservedBlock) -> Self {
        Self { number: block.number, hash: block.hash, parent_hash: block.parent_hash }
    }
}

/// Transaction hashes of one block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionIndex {
    pub txs: Vec<B256>,
}

// ─── Index ────────────────────────────────────────────────────────────────────

/// Fork-aware index of block headers and transaction membership.
///
/// Writes are not synchronized against each other: route every
/// [`save_block`](Self::save_block) for one chain through a single task
/// (see [`BlockRecorder`](crate::BlockRecorder)).
#[derive(Clone)]
pub struct ChainStateIndex {
    store: Arc<dyn KvStore>,
    config: IndexConfig,
}

impl ChainStateIndex {
    pub fn new(store: Arc<dyn KvStore>, config: IndexConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Record `block` as the latest block and store its header.
    ///
    /// A number at or below the current cursor is logged and written anyway:
    /// the cursor always holds the last block saved.
    pub async fn save_block(&self, block: &ObservedBlock) -> Result<BlockIndex, IndexError> {
        let record = BlockIndex::from(block);

        let current = match self.get_block_number().await {
            Ok(n) => n,
            Err(IndexError::NotFound { .. }) => self.config.default_block_number,
            Err(e @ IndexError::Corruption { .. }) => {
                warn!(error = %e, "unreadable block cursor; using default");
                self.config.default_block_number
            }
            Err(e) => return Err(e),
        };

        if record.number <= current {
            warn!(
                number = record.number,
                cursor = current,
                hash = %record.hash,
                "block number does not advance the cursor"
            );
        }

        self.store
            .put(&Table::Cursor.key(&[]), record.number.to_string().as_bytes())
            .await?;
        self.save_block_index(&record).await?;
        self.mark_canonical(&record).await?;

        debug!(number = record.number, hash = %record.hash, "saved block");
        Ok(record)
    }

    /// The cursor: the number of the last block saved.
    pub async fn get_block_number(&self) -> Result<u64, IndexError> {
        let key = display_key(Table::Cursor, &[]);
        let raw = self
            .store
            .get(&Table::Cursor.key(&[]))
            .await?
            .ok_or_else(|| IndexError::NotFound { key: key.clone() })?;

        std::str::from_utf8(&raw)
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .ok_or_else(|| IndexError::Corruption {
                key,
                reason: format!("not a decimal block number: {:?}", String::from_utf8_lossy(&raw)),
            })
    }

    pub async fn save_block_index(&self, record: &BlockIndex) -> Result<(), IndexError> {
        self.put_json(Table::BlockHash, record.hash.as_slice(), record).await
    }

    /// Header stored under `hash`. `NotFound` means the block was never indexed.
    pub async fn get_block_index(&self, hash: &B256) -> Result<BlockIndex, IndexError> {
        self.get_json(Table::BlockHash, hash.as_slice()).await
    }

    /// Hash of the block on the head's chain at `number`.
    ///
    /// Entries above the cursor are left over from a longer branch that was
    /// since replaced; callers compare against the cursor before trusting them.
    pub async fn get_canonical_hash(&self, number: u64) -> Result<B256, IndexError> {
        self.get_json(Table::CanonicalHash, &number.to_be_bytes()).await
    }

    /// Whether `header` lies on the chain ending at the block saved last.
    pub async fn is_canonical(&self, header: &BlockIndex, cursor: u64) -> Result<bool, IndexError> {
        if header.number > cursor {
            return Ok(false);
        }
        match self.get_canonical_hash(header.number).await {
            Ok(hash) => Ok(hash == header.hash),
            Err(IndexError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Point the height→hash table at `head` and at every indexed ancestor
    /// that disagrees with it, stopping at the first one already in place.
    async fn mark_canonical(&self, head: &BlockIndex) -> Result<(), IndexError> {
        let mut current = *head;
        for _ in 0..=self.config.max_reorg_depth {
            self.put_json(Table::CanonicalHash, &current.number.to_be_bytes(), &current.hash)
                .await?;
            if current.number == 0 {
                break;
            }
            let parent = match self.get_block_index(&current.parent_hash).await {
                Ok(parent) => parent,
                Err(IndexError::NotFound { .. }) => break,
                Err(e) => return Err(e),
            };
            match self.get_canonical_hash(parent.number).await {
                Ok(hash) if hash == parent.hash => break,
                Ok(_) | Err(IndexError::NotFound { .. }) => current = parent,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Replace the whole transaction set stored for `block_hash`.
    pub async fn save_transactions(&self, block_hash: &B256, txs: &[B256]) -> Result<(), IndexError> {
        let record = TransactionIndex { txs: txs.to_vec() };
        self.put_json(Table::TransactionHash, block_hash.as_slice(), &record).await
    }

    pub async fn get_transactions(&self, block_hash: &B256) -> Result<Vec<B256>, IndexError> {
        let record: TransactionIndex = self.get_json(Table::TransactionHash, block_hash.as_slice()).await?;
        Ok(record.txs)
    }

    /// Whether `tx_hash` is in the set stored for `block_hash`.
    ///
    /// Returns `Ok(false)` for an unknown transaction; errors only when the
    /// block's set is missing or unreadable.
    pub async fn find_transaction(&self, block_hash: &B256, tx_hash: &B256) -> Result<bool, IndexError> {
        let txs = self.get_transactions(block_hash).await?;
        Ok(txs.contains(tx_hash))
    }

    async fn put_json<T: Serialize>(&self, table: Table, suffix: &[u8], value: &T) -> Result<(), IndexError> {
        let bytes = serde_json::to_vec(value).map_err(|e| IndexError::Storage(e.to_string()))?;
        self.store.put(&table.key(suffix), &bytes).await
    }

    async fn get_json<T: DeserializeOwned>(&self, table: Table, suffix: &[u8]) -> Result<T, IndexError> {
        let raw = self
            .store
            .get(&table.key(suffix))
            .await?
            .ok_or_else(|| IndexError::NotFound { key: display_key(table, suffix) })?;
        serde_json::from_slice(&raw).map_err(|e| IndexError::Corruption {
            key: display_key(table, suffix),
            reason: e.to_string(),
        })
    }
}

impl std::fmt::Debug for ChainStateIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainStateIndex").field("config", &self.config).finish_non_exhaustive()
    }
}
