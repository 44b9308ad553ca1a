//! Call, send, and subscription flows against an in-process mock node.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use k256::ecdsa::SigningKey;

use ringrelay_contract::{
    Contract, ContractError, DecodedLog, DynSolValue, OverflowPolicy, StopReason, WatchConfig,
};
use ringrelay_core::{Keystore, ObservedBlock};
use ringrelay_rpc::{
    BlockTag, CallRequest, EthApi, FilterQuery, JsonRpcError, Log, TransactionRequest,
    TransportError,
};

const TOKEN_ABI: &str = r#"[
    {"type":"function","name":"transfer","stateMutability":"nonpayable",
     "inputs":[{"name":"to","type":"address"},{"name":"value","type":"uint256"}],
     "outputs":[{"name":"","type":"bool"}]},
    {"type":"function","name":"balanceOf","stateMutability":"view",
     "inputs":[{"name":"owner","type":"address"}],
     "outputs":[{"name":"","type":"uint256"}]},
    {"type":"event","name":"Transfer","anonymous":false,
     "inputs":[{"name":"from","type":"address","indexed":true},
               {"name":"to","type":"address","indexed":true},
               {"name":"value","type":"uint256","indexed":false}]}
]"#;

// ─── Mock node ────────────────────────────────────────────────────────────────

#[derive(Default)]
struct MockNode {
    calls: Mutex<Vec<&'static str>>,
    fail_gas_price: bool,
    call_result: Bytes,
    /// Each poll pops one batch; an empty queue yields no logs.
    batches: Mutex<VecDeque<Result<Vec<Log>, ()>>>,
    sent: Mutex<Vec<TransactionRequest>>,
    /// Accounts whose nonce and gas estimate were requested.
    senders: Mutex<Vec<Address>>,
    raw: Mutex<Vec<Bytes>>,
    uninstalled: Mutex<Vec<U256>>,
}

impl MockNode {
    fn record(&self, name: &'static str) {
        self.calls.lock().unwrap().push(name);
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

fn node_error() -> TransportError {
    TransportError::Rpc(JsonRpcError { code: -32000, message: "boom".into(), data: None })
}

#[async_trait]
impl EthApi for MockNode {
    async fn call(&self, _req: &CallRequest, _block: BlockTag) -> Result<Bytes, TransportError> {
        self.record("call");
        Ok(self.call_result.clone())
    }

    async fn estimate_gas(&self, req: &CallRequest) -> Result<U256, TransportError> {
        self.record("estimate_gas");
        assert!(req.gas_price.is_some());
        self.senders.lock().unwrap().extend(req.from);
        Ok(U256::from(90_000u64))
    }

    async fn gas_price(&self) -> Result<U256, TransportError> {
        self.record("gas_price");
        if self.fail_gas_price {
            return Err(node_error());
        }
        Ok(U256::from(20_000_000_000u64))
    }

    async fn get_transaction_count(&self, account: Address, block: BlockTag) -> Result<U256, TransportError> {
        self.record("get_transaction_count");
        self.senders.lock().unwrap().push(account);
        assert_eq!(block, BlockTag::Pending);
        Ok(U256::from(4u64))
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256, TransportError> {
        self.record("send_raw_transaction");
        self.raw.lock().unwrap().push(raw);
        Ok(B256::repeat_byte(0xaa))
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<B256, TransportError> {
        self.record("send_transaction");
        self.sent.lock().unwrap().push(tx.clone());
        Ok(B256::repeat_byte(0xbb))
    }

    async fn new_filter(&self, filter: &FilterQuery) -> Result<U256, TransportError> {
        self.record("new_filter");
        assert_eq!(filter.address.len(), 1);
        assert_eq!(filter.topics.len(), 1);
        Ok(U256::from(0x10u64))
    }

    async fn get_filter_changes(&self, _id: U256) -> Result<Vec<Log>, TransportError> {
        match self.batches.lock().unwrap().pop_front() {
            Some(Ok(logs)) => Ok(logs),
            Some(Err(())) => Err(node_error()),
            None => Ok(vec![]),
        }
    }

    async fn uninstall_filter(&self, id: U256) -> Result<bool, TransportError> {
        self.uninstalled.lock().unwrap().push(id);
        Ok(true)
    }

    async fn block_number(&self) -> Result<u64, TransportError> {
        Ok(0)
    }

    async fn get_block_by_number(&self, _b: BlockTag) -> Result<Option<ObservedBlock>, TransportError> {
        Ok(None)
    }

    async fn get_block_by_hash(&self, _h: B256) -> Result<Option<ObservedBlock>, TransportError> {
        Ok(None)
    }
}

fn contract(node: &Arc<MockNode>) -> Contract {
    Contract::bind(TOKEN_ABI, Address::repeat_byte(0xcc), node.clone()).unwrap()
}

fn transfer_args() -> Vec<DynSolValue> {
    vec![
        DynSolValue::Address(Address::repeat_byte(0x01)),
        DynSolValue::Uint(U256::from(10u64), 256),
    ]
}

fn transfer_log(contract: &Contract, value: u64) -> Log {
    let event = contract.event("Transfer").unwrap();
    Log {
        address: contract.address(),
        topics: vec![
            event.topic0(),
            Address::repeat_byte(0x0a).into_word(),
            Address::repeat_byte(0x0b).into_word(),
        ],
        data: Bytes::from(U256::from(value).to_be_bytes::<32>().to_vec()),
        ..Default::default()
    }
}

fn fast_watch(capacity: usize, overflow: OverflowPolicy) -> WatchConfig {
    WatchConfig { poll_interval_ms: 10, channel_capacity: capacity, overflow }
}

// ─── Call / send ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn call_decodes_typed_output() {
    let node = Arc::new(MockNode {
        call_result: Bytes::from(U256::from(77u64).to_be_bytes::<32>().to_vec()),
        ..Default::default()
    });
    let c = contract(&node);
    let balance_of = c.method("balanceOf").unwrap();
    let balance: U256 = c
        .call_as(&balance_of, BlockTag::Latest, &[DynSolValue::Address(Address::ZERO)])
        .await
        .unwrap();
    assert_eq!(balance, U256::from(77u64));
    assert_eq!(node.calls(), vec!["call"]);
}

#[tokio::test]
async fn remote_send_prices_estimates_and_uses_pending_nonce() {
    let node = Arc::new(MockNode::default());
    let c = contract(&node);
    let transfer = c.method("transfer").unwrap();
    let from = Address::repeat_byte(0x99);

    let hash = c.send_transaction(&transfer, from, &transfer_args()).await.unwrap();
    assert_eq!(hash, B256::repeat_byte(0xbb));
    assert_eq!(
        node.calls(),
        vec!["gas_price", "estimate_gas", "get_transaction_count", "send_transaction"]
    );

    let sent = node.sent.lock().unwrap();
    assert_eq!(sent[0].from, from);
    assert_eq!(sent[0].gas, U256::from(90_000u64));
    assert_eq!(sent[0].nonce, U256::from(4u64));
    assert_eq!(sent[0].value, U256::ZERO);
    assert_eq!(&sent[0].data[..4], transfer.selector().as_slice());
}

#[tokio::test]
async fn local_account_is_signed_and_sent_raw() {
    let node = Arc::new(MockNode::default());
    let mut ks = Keystore::new();
    let from = ks.insert(SigningKey::from_slice(&[0x21; 32]).unwrap());
    let c = contract(&node).with_local_signer(Arc::new(ks), 1);
    let transfer = c.method("transfer").unwrap();

    let hash = c.send_transaction(&transfer, from, &transfer_args()).await.unwrap();
    assert_eq!(hash, B256::repeat_byte(0xaa));
    assert_eq!(node.calls().last(), Some(&"send_raw_transaction"));
    assert!(node.sent.lock().unwrap().is_empty());
    assert!(!node.raw.lock().unwrap()[0].is_empty());
}

#[tokio::test]
async fn zero_sender_defaults_to_first_local_account() {
    let node = Arc::new(MockNode::default());
    let mut ks = Keystore::new();
    let first = ks.insert(SigningKey::from_slice(&[0x21; 32]).unwrap());
    ks.insert(SigningKey::from_slice(&[0x22; 32]).unwrap());
    let c = contract(&node).with_local_signer(Arc::new(ks), 1);
    let transfer = c.method("transfer").unwrap();

    c.send_transaction(&transfer, Address::ZERO, &transfer_args()).await.unwrap();
    assert_eq!(*node.senders.lock().unwrap(), vec![first, first]);
    assert_eq!(node.calls().last(), Some(&"send_raw_transaction"));

    // without a local signer the zero address goes to the node as given
    let remote = Arc::new(MockNode::default());
    let c = contract(&remote);
    let (gas, gas_price) = (U256::from(21_000u64), U256::from(1u64));
    c.send_transaction_with_gas(&transfer, Address::ZERO, gas, gas_price, &transfer_args())
        .await
        .unwrap();
    assert_eq!(remote.sent.lock().unwrap()[0].from, Address::ZERO);
}

#[tokio::test]
async fn encoding_error_precedes_any_node_call() {
    let node = Arc::new(MockNode::default());
    let c = contract(&node);
    let transfer = c.method("transfer").unwrap();
    let err = c
        .send_transaction(&transfer, Address::ZERO, &[DynSolValue::Bool(true)])
        .await
        .unwrap_err();
    assert!(matches!(err, ContractError::Encoding { .. }));
    assert!(node.calls().is_empty());
}

#[tokio::test]
async fn fixed_gas_must_be_positive() {
    let node = Arc::new(MockNode::default());
    let c = contract(&node);
    let transfer = c.method("transfer").unwrap();

    for (gas, price) in [(0u64, 1u64), (21_000, 0)] {
        let err = c
            .send_transaction_with_gas(&transfer, Address::ZERO, U256::from(gas), U256::from(price), &transfer_args())
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::InvalidGas { .. }));
    }
    assert!(node.calls().is_empty());

    c.send_transaction_with_gas(
        &transfer,
        Address::ZERO,
        U256::from(21_000u64),
        U256::from(1u64),
        &transfer_args(),
    )
    .await
    .unwrap();
    assert_eq!(node.calls(), vec!["get_transaction_count", "send_transaction"]);
}

#[tokio::test]
async fn node_failure_propagates_without_retry() {
    let node = Arc::new(MockNode { fail_gas_price: true, ..Default::default() });
    let c = contract(&node);
    let transfer = c.method("transfer").unwrap();
    let err = c.send_transaction(&transfer, Address::ZERO, &transfer_args()).await.unwrap_err();
    assert!(err.is_node_error());
    assert_eq!(node.calls(), vec!["gas_price"]);
}

// ─── Subscriptions ────────────────────────────────────────────────────────────

#[tokio::test]
async fn poll_errors_are_skipped_and_events_delivered() {
    let node = Arc::new(MockNode::default());
    let c = contract(&node);
    {
        let mut batches = node.batches.lock().unwrap();
        batches.push_back(Err(()));
        batches.push_back(Ok(vec![transfer_log(&c, 1), transfer_log(&c, 2)]));
        // undecodable: wrong topic count
        batches.push_back(Ok(vec![Log { topics: vec![B256::ZERO], ..Default::default() }]));
        batches.push_back(Ok(vec![transfer_log(&c, 3)]));
    }

    let event = c.event("Transfer").unwrap();
    let mut sub = c
        .subscribe::<DecodedLog>(&event, BlockTag::Latest, None, &fast_watch(16, OverflowPolicy::Block))
        .await
        .unwrap();
    assert_eq!(sub.filter_id(), U256::from(0x10u64));

    let mut values = vec![];
    for _ in 0..3 {
        let ev = tokio::time::timeout(Duration::from_secs(5), sub.next_event())
            .await
            .unwrap()
            .unwrap();
        values.push(ev.field("value").cloned().unwrap());
    }
    assert_eq!(
        values,
        (1u64..=3).map(|n| DynSolValue::Uint(U256::from(n), 256)).collect::<Vec<_>>()
    );

    let report = sub.shutdown().await;
    assert_eq!(report.reason, StopReason::Cancelled);
    assert_eq!(report.delivered, 3);
    assert_eq!(report.poll_errors, 1);
    assert_eq!(report.decode_errors, 1);
    assert!(report.uninstalled);
    assert_eq!(*node.uninstalled.lock().unwrap(), vec![U256::from(0x10u64)]);
}

#[tokio::test]
async fn fail_policy_stops_on_full_buffer() {
    let node = Arc::new(MockNode::default());
    let c = contract(&node);
    node.batches
        .lock()
        .unwrap()
        .push_back(Ok((0..3).map(|n| transfer_log(&c, n)).collect()));

    let event = c.event("Transfer").unwrap();
    let mut sub = c
        .subscribe::<DecodedLog>(&event, BlockTag::Earliest, None, &fast_watch(1, OverflowPolicy::Fail))
        .await
        .unwrap();

    // one buffered event, then the stream ends
    assert!(sub.next_event().await.is_some());
    assert!(tokio::time::timeout(Duration::from_secs(5), sub.next_event())
        .await
        .unwrap()
        .is_none());

    let report = sub.shutdown().await;
    assert_eq!(report.reason, StopReason::Overflow);
    assert_eq!(report.delivered, 1);
    assert!(report.uninstalled);
}

#[tokio::test]
async fn blocked_delivery_still_honours_shutdown() {
    let node = Arc::new(MockNode::default());
    let c = contract(&node);
    node.batches
        .lock()
        .unwrap()
        .push_back(Ok((0..4).map(|n| transfer_log(&c, n)).collect()));

    let event = c.event("Transfer").unwrap();
    let sub = c
        .subscribe::<DecodedLog>(&event, BlockTag::Latest, None, &fast_watch(1, OverflowPolicy::Block))
        .await
        .unwrap();

    // let the loop fill the buffer and block on the second send
    tokio::time::sleep(Duration::from_millis(100)).await;
    let report = tokio::time::timeout(Duration::from_secs(5), sub.shutdown()).await.unwrap();
    assert_eq!(report.reason, StopReason::Cancelled);
    assert_eq!(report.delivered, 1);
    assert!(report.uninstalled);
}
