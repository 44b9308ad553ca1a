//! The ring-settlement protocol contract, bound to typed calls and events.

use std::sync::Arc;

use alloy_core::dyn_abi::DynSolValue;
use alloy_primitives::{Address, B256, U256};

use ringrelay_core::RingSubmitInputs;
use ringrelay_rpc::{BlockTag, EthApi};

use crate::binding::{ContractAbi, DecodedLog, EventDescriptor, MethodDescriptor};
use crate::codec::{self, EventDecode};
use crate::contract::Contract;
use crate::error::{BindError, ContractError};
use crate::watch::{EventSubscription, WatchConfig};

const SUBMIT_RING: &str = "submitRing";
const RING_MINED: &str = "RingMined";
const ORDER_CANCELLED: &str = "OrderCancelled";

/// Registration table for the protocol contract.
///
/// Binding fails with [`BindError`] if the ABI lacks `submitRing` or either
/// event.
#[derive(Clone)]
pub struct ProtocolContract {
    contract: Contract,
    submit_ring: Arc<MethodDescriptor>,
    ring_mined: Arc<EventDescriptor>,
    order_cancelled: Arc<EventDescriptor>,
}

impl ProtocolContract {
    pub fn bind(abi_json: &str, address: Address, client: Arc<dyn EthApi>) -> Result<Self, BindError> {
        Self::from_contract(Contract::bind(abi_json, address, client)?)
    }

    pub fn from_contract(contract: Contract) -> Result<Self, BindError> {
        let abi: &ContractAbi = contract.abi();
        Ok(Self {
            submit_ring: abi.method(SUBMIT_RING)?,
            ring_mined: abi.event(RING_MINED)?,
            order_cancelled: abi.event(ORDER_CANCELLED)?,
            contract,
        })
    }

    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    pub fn address(&self) -> Address {
        self.contract.address()
    }

    pub fn submit_ring_method(&self) -> &MethodDescriptor {
        &self.submit_ring
    }

    /// Submit a signed ring from `from`, estimating gas.
    pub async fn submit_ring(&self, from: Address, inputs: &RingSubmitInputs) -> Result<B256, ContractError> {
        self.contract.send_transaction(&self.submit_ring, from, &submit_ring_args(inputs)).await
    }

    /// Submit a signed ring with a fixed gas limit and price.
    pub async fn submit_ring_with_gas(
        &self,
        from: Address,
        gas: U256,
        gas_price: U256,
        inputs: &RingSubmitInputs,
    ) -> Result<B256, ContractError> {
        self.contract
            .send_transaction_with_gas(&self.submit_ring, from, gas, gas_price, &submit_ring_args(inputs))
            .await
    }

    pub async fn watch_ring_mined(
        &self,
        from_block: BlockTag,
        config: &WatchConfig,
    ) -> Result<EventSubscription<RingMinedEvent>, ContractError> {
        self.contract.subscribe(&self.ring_mined, from_block, None, config).await
    }

    pub async fn watch_order_cancelled(
        &self,
        from_block: BlockTag,
        config: &WatchConfig,
    ) -> Result<EventSubscription<OrderCancelledEvent>, ContractError> {
        self.contract.subscribe(&self.order_cancelled, from_block, None, config).await
    }
}

/// The ten positional arguments of `submitRing`, in ABI order.
pub fn submit_ring_args(inputs: &RingSubmitInputs) -> Vec<DynSolValue> {
    let uint = |n: U256| DynSolValue::Uint(n, 256);
    let uint8 = |n: u8| DynSolValue::Uint(U256::from(n), 8);
    let word = |b: &B256| DynSolValue::FixedBytes(*b, 32);

    vec![
        DynSolValue::Array(
            inputs
                .address_list
                .iter()
                .map(|pair| DynSolValue::FixedArray(pair.iter().copied().map(DynSolValue::Address).collect()))
                .collect(),
        ),
        DynSolValue::Array(
            inputs
                .uint_args_list
                .iter()
                .map(|row| DynSolValue::FixedArray(row.iter().copied().map(uint).collect()))
                .collect(),
        ),
        DynSolValue::Array(
            inputs
                .uint8_args_list
                .iter()
                .map(|pair| DynSolValue::FixedArray(pair.iter().copied().map(uint8).collect()))
                .collect(),
        ),
        DynSolValue::Array(
            inputs.buy_no_more_than_amount_b_list.iter().copied().map(DynSolValue::Bool).collect(),
        ),
        DynSolValue::Array(inputs.v_list.iter().copied().map(uint8).collect()),
        DynSolValue::Array(inputs.r_list.iter().map(word).collect()),
        DynSolValue::Array(inputs.s_list.iter().map(word).collect()),
        DynSolValue::Address(inputs.ringminer),
        DynSolValue::Address(inputs.fee_recipient),
        DynSolValue::Bool(inputs.throw_if_lrc_is_insufficient),
    ]
}

// ─── Events ───────────────────────────────────────────────────────────────────

/// A ring settled on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingMinedEvent {
    pub ring_index: U256,
    pub ring_hash: B256,
    pub miner: Address,
    pub fee_recipient: Address,
    pub is_ring_hash_reserved: bool,
    pub order_hashes: Vec<B256>,
    pub block_number: Option<u64>,
    pub transaction_hash: Option<B256>,
    /// Set when the log was dropped by a reorganization.
    pub removed: bool,
}

impl EventDecode for RingMinedEvent {
    fn decode_event(log: DecodedLog) -> Result<Self, ContractError> {
        let order_hashes = codec::as_list(codec::field(&log, "_orderHashList")?)?
            .iter()
            .map(codec::as_b256)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            ring_index: codec::as_uint(codec::field(&log, "_ringIndex")?)?,
            ring_hash: codec::as_b256(codec::field(&log, "_ringhash")?)?,
            miner: codec::as_address(codec::field(&log, "_miner")?)?,
            fee_recipient: codec::as_address(codec::field(&log, "_feeRecipient")?)?,
            is_ring_hash_reserved: codec::as_bool(codec::field(&log, "_isRinghashReserved")?)?,
            order_hashes,
            block_number: log.block_number,
            transaction_hash: log.transaction_hash,
            removed: log.removed,
        })
    }
}

/// An order was cancelled (fully or partially) on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCancelledEvent {
    pub order_hash: B256,
    pub amount_cancelled: U256,
    pub block_number: Option<u64>,
    pub transaction_hash: Option<B256>,
    pub removed: bool,
}

impl EventDecode for OrderCancelledEvent {
    fn decode_event(log: DecodedLog) -> Result<Self, ContractError> {
        Ok(Self {
            order_hash: codec::as_b256(codec::field(&log, "_orderHash")?)?,
            amount_cancelled: codec::as_uint(codec::field(&log, "_amountCancelled")?)?,
            block_number: log.block_number,
            transaction_hash: log.transaction_hash,
            removed: log.removed,
        })
    }
}

/// Protocol ABI subset used by the relay: `submitRing` plus its two events.
pub const PROTOCOL_ABI: &str = r#"[
  {"type":"function","name":"submitRing","stateMutability":"nonpayable","outputs":[],
   "inputs":[
     {"name":"addressList","type":"address[2][]"},
     {"name":"uintArgsList","type":"uint256[7][]"},
     {"name":"uint8ArgsList","type":"uint8[2][]"},
     {"name":"buyNoMoreThanAmountBList","type":"bool[]"},
     {"name":"vList","type":"uint8[]"},
     {"name":"rList","type":"bytes32[]"},
     {"name":"sList","type":"bytes32[]"},
     {"name":"ringminer","type":"address"},
     {"name":"feeRecepient","type":"address"},
     {"name":"throwIfLRCIsInsuffcient","type":"bool"}]},
  {"type":"event","name":"RingMined","anonymous":false,
   "inputs":[
     {"name":"_ringIndex","type":"uint256","indexed":false},
     {"name":"_ringhash","type":"bytes32","indexed":true},
     {"name":"_miner","type":"address","indexed":false},
     {"name":"_feeRecipient","type":"address","indexed":false},
     {"name":"_isRinghashReserved","type":"bool","indexed":false},
     {"name":"_orderHashList","type":"bytes32[]","indexed":false},
     {"name":"_amountsList","type":"uint256[6][]","indexed":false}]},
  {"type":"event","name":"OrderCancelled","anonymous":false,
   "inputs":[
     {"name":"_orderHash","type":"bytes32","indexed":true},
     {"name":"_amountCancelled","type":"uint256","indexed":false}]}
]"#;
