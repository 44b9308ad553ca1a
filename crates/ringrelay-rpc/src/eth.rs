//! Typed `eth_*` client over any [`RpcTransport`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use alloy_primitives::{Address, Bytes, B256, U256, U64};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use ringrelay_core::ObservedBlock;

use crate::error::TransportError;
use crate::request::JsonRpcRequest;
use crate::transport::RpcTransport;
use crate::types::{BlockTag, CallRequest, FilterQuery, Log, TransactionRequest};

/// The node operations the relay consumes.
///
/// Mock implementations of this trait stand in for a node in tests.
#[async_trait]
pub trait EthApi: Send + Sync {
    async fn call(&self, req: &CallRequest, block: BlockTag) -> Result<Bytes, TransportError>;

    async fn estimate_gas(&self, req: &CallRequest) -> Result<U256, TransportError>;

    async fn gas_price(&self) -> Result<U256, TransportError>;

    async fn get_transaction_count(
        &self,
        address: Address,
        block: BlockTag,
    ) -> Result<U256, TransportError>;

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256, TransportError>;

    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<B256, TransportError>;

    async fn new_filter(&self, filter: &FilterQuery) -> Result<U256, TransportError>;

    async fn get_filter_changes(&self, id: U256) -> Result<Vec<Log>, TransportError>;

    async fn uninstall_filter(&self, id: U256) -> Result<bool, TransportError>;

    async fn block_number(&self) -> Result<u64, TransportError>;

    /// Header plus transaction hashes; `None` if the node does not know the block.
    async fn get_block_by_number(
        &self,
        block: BlockTag,
    ) -> Result<Option<ObservedBlock>, TransportError>;

    async fn get_block_by_hash(&self, hash: B256) -> Result<Option<ObservedBlock>, TransportError>;
}

/// [`EthApi`] implementation issuing JSON-RPC requests through a transport.
#[derive(Clone)]
pub struct EthClient {
    transport: Arc<dyn RpcTransport>,
    next_id: Arc<AtomicU64>,
}

impl EthClient {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport, next_id: Arc::new(AtomicU64::new(1)) }
    }

    pub fn url(&self) -> &str {
        self.transport.url()
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let resp = self.transport.send(JsonRpcRequest::new(id, method, params)).await?;
        let result = resp.into_result().map_err(TransportError::Rpc)?;
        Ok(serde_json::from_value(result)?)
    }
}

fn to_param<T: serde::Serialize>(value: &T) -> Result<Value, TransportError> {
    serde_json::to_value(value).map_err(|e| TransportError::InvalidRequest { reason: e.to_string() })
}

#[async_trait]
impl EthApi for EthClient {
    async fn call(&self, req: &CallRequest, block: BlockTag) -> Result<Bytes, TransportError> {
        self.request("eth_call", vec![to_param(req)?, to_param(&block)?]).await
    }

    async fn estimate_gas(&self, req: &CallRequest) -> Result<U256, TransportError> {
        self.request("eth_estimateGas", vec![to_param(req)?]).await
    }

    async fn gas_price(&self) -> Result<U256, TransportError> {
        self.request("eth_gasPrice", vec![]).await
    }

    async fn get_transaction_count(
        &self,
        address: Address,
        block: BlockTag,
    ) -> Result<U256, TransportError> {
        self.request("eth_getTransactionCount", vec![to_param(&address)?, to_param(&block)?])
            .await
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256, TransportError> {
        self.request("eth_sendRawTransaction", vec![to_param(&raw)?]).await
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<B256, TransportError> {
        self.request("eth_sendTransaction", vec![to_param(tx)?]).await
    }

    async fn new_filter(&self, filter: &FilterQuery) -> Result<U256, TransportError> {
        self.request("eth_newFilter", vec![to_param(filter)?]).await
    }

    async fn get_filter_changes(&self, id: U256) -> Result<Vec<Log>, TransportError> {
        self.request("eth_getFilterChanges", vec![to_param(&id)?]).await
    }

    async fn uninstall_filter(&self, id: U256) -> Result<bool, TransportError> {
        self.request("eth_uninstallFilter", vec![to_param(&id)?]).await
    }

    async fn block_number(&self) -> Result<u64, TransportError> {
        let n: U64 = self.request("eth_blockNumber", vec![]).await?;
        Ok(n.to::<u64>())
    }

    async fn get_block_by_number(
        &self,
        block: BlockTag,
    ) -> Result<Option<ObservedBlock>, TransportError> {
        self.request("eth_getBlockByNumber", vec![to_param(&block)?, json!(false)]).await
    }

    async fn get_block_by_hash(&self, hash: B256) -> Result<Option<ObservedBlock>, TransportError> {
        self.request("eth_getBlockByHash", vec![to_param(&hash)?, json!(false)]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{JsonRpcError, JsonRpcResponse};
    use std::sync::Mutex;

    /// Replies to each method with a canned value and records every request.
    struct MockTransport {
        replies: Vec<(&'static str, Result<Value, JsonRpcError>)>,
        seen: Mutex<Vec<JsonRpcRequest>>,
    }

    impl MockTransport {
        fn new(replies: Vec<(&'static str, Result<Value, JsonRpcError>)>) -> Arc<Self> {
            Arc::new(Self { replies, seen: Mutex::new(vec![]) })
        }
    }

    #[async_trait]
    impl RpcTransport for MockTransport {
        async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
            let id = match req.id {
                crate::request::RpcId::Number(n) => n,
                _ => 0,
            };
            let reply = self
                .replies
                .iter()
                .find(|(m, _)| *m == req.method)
                .map(|(_, r)| r.clone())
                .unwrap_or(Ok(Value::Null));
            self.seen.lock().unwrap().push(req);
            Ok(match reply {
                Ok(v) => JsonRpcResponse::success(id, v),
                Err(e) => JsonRpcResponse::failure(id, e),
            })
        }

        fn url(&self) -> &str {
            "mock://node"
        }
    }

    #[tokio::test]
    async fn quantities_decode_from_hex() {
        let mock = MockTransport::new(vec![
            ("eth_gasPrice", Ok(json!("0x3b9aca00"))),
            ("eth_blockNumber", Ok(json!("0x64"))),
        ]);
        let client = EthClient::new(mock.clone());
        assert_eq!(client.gas_price().await.unwrap(), U256::from(1_000_000_000u64));
        assert_eq!(client.block_number().await.unwrap(), 100);

        let seen = mock.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_ne!(seen[0].id, seen[1].id);
    }

    #[tokio::test]
    async fn nonce_request_uses_pending_tag() {
        let mock = MockTransport::new(vec![("eth_getTransactionCount", Ok(json!("0x7")))]);
        let client = EthClient::new(mock.clone());
        let nonce = client
            .get_transaction_count(Address::repeat_byte(0x01), BlockTag::Pending)
            .await
            .unwrap();
        assert_eq!(nonce, U256::from(7u64));
        let seen = mock.seen.lock().unwrap();
        assert_eq!(seen[0].params[1], json!("pending"));
    }

    #[tokio::test]
    async fn node_error_propagates_unchanged() {
        let mock = MockTransport::new(vec![(
            "eth_estimateGas",
            Err(JsonRpcError { code: 3, message: "execution reverted".into(), data: None }),
        )]);
        let client = EthClient::new(mock);
        let err = client.estimate_gas(&CallRequest::default()).await.unwrap_err();
        match err {
            TransportError::Rpc(e) => assert_eq!(e.message, "execution reverted"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unknown_block_is_none() {
        let mock = MockTransport::new(vec![]);
        let client = EthClient::new(mock);
        assert!(client.get_block_by_number(BlockTag::Number(5)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn block_by_hash_decodes_header_and_txs() {
        let mock = MockTransport::new(vec![(
            "eth_getBlockByHash",
            Ok(json!({
                "number": "0x2a",
                "hash": format!("0x{}", "11".repeat(32)),
                "parentHash": format!("0x{}", "10".repeat(32)),
                "timestamp": "0x5a0b2c00",
                "transactions": [format!("0x{}", "aa".repeat(32))]
            })),
        )]);
        let client = EthClient::new(mock.clone());
        let block = client.get_block_by_hash(B256::repeat_byte(0x11)).await.unwrap().unwrap();
        assert_eq!(block.number, 42);
        assert_eq!(block.parent_hash, B256::repeat_byte(0x10));
        assert_eq!(block.transactions, vec![B256::repeat_byte(0xaa)]);
        assert_eq!(mock.seen.lock().unwrap()[0].params[1], json!(false));
    }

    #[tokio::test]
    async fn malformed_result_is_deserialization_error() {
        let mock = MockTransport::new(vec![("eth_gasPrice", Ok(json!({"not": "a quantity"})))]);
        let client = EthClient::new(mock);
        assert!(matches!(
            client.gas_price().await.unwrap_err(),
            TransportError::Deserialization(_)
        ));
    }
}
