//! Request and response shapes of the `eth_*` methods.
//!
//! Every integer crosses the wire as a `0x` quantity (`U256`/`U64` serde),
//! never as a fixed-width JSON number.

use alloy_primitives::{Address, Bytes, B256, U256, U64};
use serde::{Deserialize, Serialize, Serializer};

use ringrelay_core::quantity;

/// Block selector for state queries and filter ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockTag {
    #[default]
    Latest,
    Pending,
    Earliest,
    Number(u64),
}

impl std::fmt::Display for BlockTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Latest => write!(f, "latest"),
            Self::Pending => write!(f, "pending"),
            Self::Earliest => write!(f, "earliest"),
            Self::Number(n) => write!(f, "{}", quantity::format_u64(*n)),
        }
    }
}

impl Serialize for BlockTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Read-only execution (`eth_call`) or gas estimation (`eth_estimateGas`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    pub to: Address,
    pub data: Bytes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
}

/// Unsigned transaction fields for `eth_sendTransaction`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub gas: U256,
    pub gas_price: U256,
    pub nonce: U256,
}

/// Log filter for `eth_newFilter`.
///
/// `topics[i] == None` matches any value in position `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_block: Option<BlockTag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_block: Option<BlockTag>,
    pub address: Vec<Address>,
    pub topics: Vec<Option<B256>>,
}

/// A log entry returned by `eth_getFilterChanges`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    #[serde(default)]
    pub block_number: Option<U64>,
    #[serde(default)]
    pub block_hash: Option<B256>,
    #[serde(default)]
    pub transaction_hash: Option<B256>,
    #[serde(default)]
    pub log_index: Option<U64>,
    /// Set when the log was dropped by a reorganization.
    #[serde(default)]
    pub removed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn block_tag_serialization() {
        assert_eq!(serde_json::to_value(BlockTag::Pending).unwrap(), json!("pending"));
        assert_eq!(serde_json::to_value(BlockTag::Number(255)).unwrap(), json!("0xff"));
    }

    #[test]
    fn call_request_omits_unset_fields() {
        let req = CallRequest {
            to: Address::repeat_byte(0x11),
            data: Bytes::from(vec![0xde, 0xad]),
            ..Default::default()
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["data"], json!("0xdead"));
        assert!(v.get("from").is_none());
        assert!(v.get("gasPrice").is_none());
    }

    #[test]
    fn transaction_quantities_are_hex() {
        let tx = TransactionRequest { gas: U256::from(21_000u64), ..Default::default() };
        let v = serde_json::to_value(&tx).unwrap();
        assert_eq!(v["gas"], json!("0x5208"));
        assert_eq!(v["nonce"], json!("0x0"));
    }

    #[test]
    fn log_decodes_node_shape() {
        let log: Log = serde_json::from_value(json!({
            "address": "0x1111111111111111111111111111111111111111",
            "topics": ["0x2222222222222222222222222222222222222222222222222222222222222222"],
            "data": "0x",
            "blockNumber": "0x10",
            "logIndex": "0x0"
        }))
        .unwrap();
        assert_eq!(log.block_number, Some(U64::from(16)));
        assert!(!log.removed);
        assert!(log.data.is_empty());
    }
}
