//! A bound contract instance: descriptor table + address + node client.

use std::sync::Arc;

use alloy_core::dyn_abi::DynSolValue;
use alloy_primitives::{Address, Bytes, B256, U256};

use ringrelay_core::Signer;
use ringrelay_rpc::{BlockTag, CallRequest, EthApi, FilterQuery, TransactionRequest};

use crate::binding::{ContractAbi, EventDescriptor, MethodDescriptor};
use crate::codec::{DecodeOutput, EventDecode};
use crate::error::{BindError, ContractError};
use crate::transaction::LegacyTransaction;
use crate::watch::{EventSubscription, WatchConfig};

/// Typed call/send/subscribe against one deployed contract.
///
/// Transaction submission is not atomic (nonce fetch, sign, send): callers
/// must serialize sends per funded account.
#[derive(Clone)]
pub struct Contract {
    address: Address,
    abi: Arc<ContractAbi>,
    client: Arc<dyn EthApi>,
    signer: Option<Arc<dyn Signer>>,
    chain_id: u64,
}

impl Contract {
    /// Parse `abi_json` and bind it to `address`.
    pub fn bind(abi_json: &str, address: Address, client: Arc<dyn EthApi>) -> Result<Self, BindError> {
        Ok(Self::new(Arc::new(ContractAbi::from_json(abi_json)?), address, client))
    }

    pub fn new(abi: Arc<ContractAbi>, address: Address, client: Arc<dyn EthApi>) -> Self {
        Self { address, abi, client, signer: None, chain_id: 1 }
    }

    /// Sign transactions locally for accounts held by `signer`, with EIP-155
    /// replay protection for `chain_id`. Other senders go through
    /// `eth_sendTransaction`.
    pub fn with_local_signer(mut self, signer: Arc<dyn Signer>, chain_id: u64) -> Self {
        self.signer = Some(signer);
        self.chain_id = chain_id;
        self
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn abi(&self) -> &ContractAbi {
        &self.abi
    }

    pub fn client(&self) -> &Arc<dyn EthApi> {
        &self.client
    }

    pub fn method(&self, name: &str) -> Result<Arc<MethodDescriptor>, BindError> {
        self.abi.method(name)
    }

    pub fn event(&self, name: &str) -> Result<Arc<EventDescriptor>, BindError> {
        self.abi.event(name)
    }

    // ─── Call ─────────────────────────────────────────────────────────────────

    /// Read-only execution at `block` with no gas, value, or nonce.
    pub async fn call(
        &self,
        method: &MethodDescriptor,
        block: BlockTag,
        args: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>, ContractError> {
        let data = method.encode_input(args)?;
        let req = CallRequest { to: self.address, data, ..Default::default() };
        let raw = self.client.call(&req, block).await?;
        method.decode_output(&raw)
    }

    /// [`call`](Self::call) and convert the outputs into `T`.
    pub async fn call_as<T: DecodeOutput>(
        &self,
        method: &MethodDescriptor,
        block: BlockTag,
        args: &[DynSolValue],
    ) -> Result<T, ContractError> {
        T::decode_output(self.call(method, block, args).await?)
    }

    // ─── Send ─────────────────────────────────────────────────────────────────

    /// Resolve the sending account: a zero `from` means the local signer's
    /// first account, when one is attached.
    pub fn sender(&self, from: Address) -> Address {
        if !from.is_zero() {
            return from;
        }
        self.signer
            .as_ref()
            .and_then(|s| s.accounts().first().copied())
            .unwrap_or(from)
    }

    /// Pack, price, estimate, and submit a state-changing call from `from`.
    pub async fn send_transaction(
        &self,
        method: &MethodDescriptor,
        from: Address,
        args: &[DynSolValue],
    ) -> Result<B256, ContractError> {
        let data = method.encode_input(args)?;
        let from = self.sender(from);
        let gas_price = self.client.gas_price().await?;
        let estimate = CallRequest {
            from: Some(from),
            to: self.address,
            data: data.clone(),
            value: None,
            gas_price: Some(gas_price),
        };
        let gas = self.client.estimate_gas(&estimate).await?;
        self.dispatch(method, from, data, gas, gas_price).await
    }

    /// Like [`send_transaction`](Self::send_transaction) with caller-supplied
    /// gas limit and price. Both must be positive.
    pub async fn send_transaction_with_gas(
        &self,
        method: &MethodDescriptor,
        from: Address,
        gas: U256,
        gas_price: U256,
        args: &[DynSolValue],
    ) -> Result<B256, ContractError> {
        let data = method.encode_input(args)?;
        if gas_price.is_zero() {
            return Err(ContractError::InvalidGas { reason: "gas price must be positive".into() });
        }
        if gas.is_zero() {
            return Err(ContractError::InvalidGas { reason: "gas limit must be positive".into() });
        }
        let from = self.sender(from);
        self.dispatch(method, from, data, gas, gas_price).await
    }

    async fn dispatch(
        &self,
        method: &MethodDescriptor,
        from: Address,
        data: Bytes,
        gas: U256,
        gas_price: U256,
    ) -> Result<B256, ContractError> {
        let nonce = self.client.get_transaction_count(from, BlockTag::Pending).await?;

        let local = self.signer.as_ref().filter(|s| s.has_account(&from));
        let tx_hash = match local {
            Some(signer) => {
                let tx = LegacyTransaction {
                    nonce,
                    gas_price,
                    gas,
                    to: self.address,
                    value: U256::ZERO,
                    data,
                    chain_id: self.chain_id,
                };
                let raw = tx.sign(signer.as_ref(), &from)?;
                self.client.send_raw_transaction(raw).await?
            }
            None => {
                let tx = TransactionRequest {
                    from,
                    to: self.address,
                    data,
                    value: U256::ZERO,
                    gas,
                    gas_price,
                    nonce,
                };
                self.client.send_transaction(&tx).await?
            }
        };

        tracing::info!(
            method = %method.name(),
            contract = %self.address,
            %from,
            %nonce,
            %gas,
            %tx_hash,
            local_signed = local.is_some(),
            "transaction sent"
        );
        Ok(tx_hash)
    }

    // ─── Subscribe ────────────────────────────────────────────────────────────

    /// Install a filter for `event` on this address over `[from_block, to_block]`
    /// and start polling it.
    pub async fn subscribe<T: EventDecode>(
        &self,
        event: &Arc<EventDescriptor>,
        from_block: BlockTag,
        to_block: Option<BlockTag>,
        config: &WatchConfig,
    ) -> Result<EventSubscription<T>, ContractError> {
        let filter = FilterQuery {
            from_block: Some(from_block),
            to_block,
            address: vec![self.address],
            topics: vec![Some(event.topic0())],
        };
        let filter_id = self.client.new_filter(&filter).await?;
        tracing::info!(
            event = %event.name(),
            contract = %self.address,
            %filter_id,
            "event subscription started"
        );
        Ok(EventSubscription::spawn(self.client.clone(), event.clone(), filter_id, config))
    }
}
