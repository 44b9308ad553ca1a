//! Key-value storage abstraction under the chain-state index.

use async_trait::async_trait;

use crate::error::IndexError;

/// Byte-oriented key-value store.
///
/// `get` returns `Ok(None)` for an absent key; the index turns that into
/// [`IndexError::NotFound`] with a readable key.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, IndexError>;

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<(), IndexError>;

    async fn delete(&self, key: &[u8]) -> Result<(), IndexError>;
}

/// Logical namespaces inside one [`KvStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    /// Single scalar: the largest block number recorded.
    Cursor,
    /// Block header records keyed by block hash.
    BlockHash,
    /// Transaction-hash sets keyed by block hash.
    TransactionHash,
    /// Hash of the head's ancestor at each height, keyed by big-endian number.
    CanonicalHash,
}

impl Table {
    pub fn prefix(self) -> &'static [u8] {
        match self {
            Self::Cursor => b"latestBlockNumber",
            Self::BlockHash => b"block_hash_table",
            Self::TransactionHash => b"transaction_hash_table",
            Self::CanonicalHash => b"canonical_hash_table",
        }
    }

    /// Full storage key for `suffix` in this namespace.
    pub fn key(self, suffix: &[u8]) -> Vec<u8> {
        let prefix = self.prefix();
        let mut key = Vec::with_capacity(prefix.len() + suffix.len());
        key.extend_from_slice(prefix);
        key.extend_from_slice(suffix);
        key
    }
}

/// Printable form of a storage key, for error messages and logs.
pub(crate) fn display_key(table: Table, suffix: &[u8]) -> String {
    let prefix = String::from_utf8_lossy(table.prefix());
    if suffix.is_empty() {
        prefix.into_owned()
    } else {
        format!("{prefix}:0x{}", hex::encode(suffix))
    }
}
