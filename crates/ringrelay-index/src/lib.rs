//! ringrelay-index — chain-state index for fork detection.
//!
//! Stores four kinds of facts in a key-value store:
//!
//! | key                       | value                                  |
//! |---------------------------|----------------------------------------|
//! | `latestBlockNumber`       | decimal text of the largest block seen |
//! | `block_hash_table` + hash | `{number, hash, parentHash}` JSON      |
//! | `transaction_hash_table` + hash | `{txs: [...]}` JSON              |
//! | `canonical_hash_table` + number | hash of the head's ancestor at that height |
//!
//! [`ChainStateIndex`] only records facts. [`check_parent`](ChainStateIndex::check_parent)
//! classifies an incoming block against them, and [`BlockRecorder`] drives the
//! single-writer sequence fork check → reconcile → save.

pub mod config;
pub mod error;
pub mod index;
pub mod kv;
pub mod memory;
pub mod reorg;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use config::IndexConfig;
pub use error::IndexError;
pub use index::{BlockIndex, ChainStateIndex, TransactionIndex};
pub use kv::{KvStore, Table};
pub use memory::MemoryKvStore;
pub use reorg::{BlockRecorder, BlockSource, ForkStatus, Reconciler, RollbackRange};
