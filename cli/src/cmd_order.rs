//! `ringrelay order-hash`, `admit`, and `ring`: offline order and ring tooling.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use alloy_primitives::Address;
use anyhow::{bail, Context, Result};
use ringrelay_contract::protocol::submit_ring_args;
use ringrelay_contract::{Contract, ContractAbi, ProtocolContract};
use ringrelay_core::Ring;
use ringrelay_gateway::{Gateway, InMemoryOrderStore, OrderRequest};
use serde::de::DeserializeOwned;

use crate::config::RelayConfig;

fn read_json<T: DeserializeOwned>(file: &Path) -> Result<T> {
    let text = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", file.display()))
}

pub fn hash(file: &Path) -> Result<()> {
    let request: OrderRequest = read_json(file)?;
    let order = request.decode()?;
    let hash = order.generate_hash();

    println!("Hash:   {hash}");
    println!("Owner:  {}", order.owner);
    match order.signer_address() {
        Ok(signer) if signer == order.owner => println!("Signer: {signer} ✓"),
        Ok(signer) => println!("Signer: {signer} ✗ (does not match owner)"),
        Err(e) => println!("Signer: unrecoverable ({e})"),
    }
    Ok(())
}

pub async fn admit(config: &RelayConfig, file: &Path) -> Result<()> {
    let request: OrderRequest = read_json(file)?;
    let gateway = Gateway::new(config.gateway.clone(), Arc::new(InMemoryOrderStore::new()));

    match gateway.ingest_request(&request).await {
        Ok(admission) => {
            println!("✓ Accepted {}", admission.state.hash());
            Ok(())
        }
        Err(e) => bail!("✗ {e}"),
    }
}

pub async fn ring(
    config: &RelayConfig,
    file: &Path,
    fee_recipient: Option<&str>,
    send: bool,
) -> Result<()> {
    let mut ring: Ring = read_json(file)?;
    if ring.orders.is_empty() {
        bail!("ring has no orders");
    }
    let fee_recipient = match fee_recipient {
        Some(s) => Address::from_str(s).context("invalid --fee-recipient")?,
        None => Address::ZERO,
    };

    let keys = config.keystore()?;
    let miner = ring.miner;
    let inputs = ring.build_submit_inputs(&keys, &miner, fee_recipient)?;

    let abi_json = config.protocol_abi()?;
    let abi = ContractAbi::from_json(&abi_json)?;
    let calldata = abi.method("submitRing")?.encode_input(&submit_ring_args(&inputs))?;

    if let Some(hash) = ring.hash() {
        println!("Ring hash:     {hash}");
    }
    println!("Orders:        {}", inputs.order_count());
    println!("Miner:         {}", inputs.ringminer);
    println!("Fee recipient: {}", inputs.fee_recipient);
    println!("Calldata:      0x{}", hex::encode(&calldata));

    if send {
        let contract = Contract::bind(&abi_json, config.protocol_address()?, config.node_client()?)?
            .with_local_signer(Arc::new(keys), config.chain_id);
        let protocol = ProtocolContract::from_contract(contract)?;
        let tx = protocol.submit_ring(miner, &inputs).await?;
        println!("Submitted:     {tx}");
    }
    Ok(())
}
