//! `ringrelay index`, `follow`, and `watch`: commands that talk to the
//! chain-state index or the node.

use std::str::FromStr;
use std::sync::Arc;

use alloy_primitives::B256;
use anyhow::{Context, Result};
use async_trait::async_trait;
use ringrelay_contract::{Contract, EventDecode, EventSubscription, ProtocolContract};
use ringrelay_index::{
    BlockIndex, BlockRecorder, BlockSource, IndexError, Reconciler, RollbackRange,
};
use ringrelay_rpc::{BlockTag, EthApi, EthClient};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::RelayConfig;

fn parse_hash(s: &str) -> Result<B256> {
    B256::from_str(s).with_context(|| format!("invalid 32-byte hash '{s}'"))
}

// ─── index ────────────────────────────────────────────────────────────────────

pub async fn index_status(config: &RelayConfig) -> Result<()> {
    let index = config.open_index().await?;
    match index.get_block_number().await {
        Ok(n) => println!("Latest block: {n}"),
        Err(IndexError::NotFound { .. }) => println!("Latest block: (nothing recorded)"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

pub async fn index_block(config: &RelayConfig, hash: &str) -> Result<()> {
    let index = config.open_index().await?;
    let hash = parse_hash(hash)?;
    let header = index.get_block_index(&hash).await?;
    println!("{}", serde_json::to_string_pretty(&header)?);

    match index.get_transactions(&hash).await {
        Ok(txs) => println!("Transactions: {}", txs.len()),
        Err(IndexError::NotFound { .. }) => println!("Transactions: (not recorded)"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

pub async fn index_tx(config: &RelayConfig, block: &str, tx: &str) -> Result<()> {
    let index = config.open_index().await?;
    let found = index.find_transaction(&parse_hash(block)?, &parse_hash(tx)?).await?;
    println!("{}", if found { "✓ recorded" } else { "✗ not in block" });
    Ok(())
}

// ─── follow ───────────────────────────────────────────────────────────────────

/// Header lookups for the fork walk, served by the node.
struct NodeBlocks(Arc<EthClient>);

#[async_trait]
impl BlockSource for NodeBlocks {
    async fn block_by_hash(&self, hash: &B256) -> Result<Option<BlockIndex>, IndexError> {
        self.0
            .get_block_by_hash(*hash)
            .await
            .map(|block| block.as_ref().map(BlockIndex::from))
            .map_err(|e| IndexError::Source { reason: e.to_string() })
    }
}

/// Reports dropped ranges. Ring and order records live outside this binary.
struct LogReconciler;

#[async_trait]
impl Reconciler for LogReconciler {
    async fn roll_back(&self, range: RollbackRange) -> Result<(), IndexError> {
        warn!(%range, depth = range.depth(), "blocks dropped by reorganization");
        Ok(())
    }
}

pub async fn follow(config: &RelayConfig, from: Option<u64>) -> Result<()> {
    let client = config.node_client()?;
    let index = config.open_index().await?;

    let mut next = match (from, index.get_block_number().await) {
        (Some(n), _) => n,
        (None, Ok(cursor)) => cursor + 1,
        (None, Err(IndexError::NotFound { .. })) => client.block_number().await?,
        (None, Err(e)) => return Err(e.into()),
    };

    let recorder = BlockRecorder::new(index, Arc::new(NodeBlocks(client.clone())))
        .with_reconciler(Arc::new(LogReconciler));
    let (tx, rx) = mpsc::channel(64);
    let writer = tokio::spawn(recorder.run(rx));

    info!(from = next, "following chain");
    let mut ticker = tokio::time::interval(config.watch.poll_interval());
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    'poll: loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {}
        }

        let head = match client.block_number().await {
            Ok(head) => head,
            Err(e) => {
                warn!(error = %e, "failed to read block number");
                continue;
            }
        };

        while next <= head {
            match client.get_block_by_number(BlockTag::Number(next)).await {
                Ok(Some(block)) => {
                    if tx.send(block).await.is_err() {
                        break 'poll;
                    }
                    next += 1;
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(number = next, error = %e, "failed to fetch block");
                    break;
                }
            }
        }
    }

    drop(tx);
    let recorded = writer.await?;
    println!("Recorded {recorded} blocks");
    Ok(())
}

// ─── watch ────────────────────────────────────────────────────────────────────

fn protocol(config: &RelayConfig) -> Result<ProtocolContract> {
    let contract = Contract::bind(&config.protocol_abi()?, config.protocol_address()?, config.node_client()?)?;
    Ok(ProtocolContract::from_contract(contract)?)
}

fn from_tag(from: Option<u64>) -> BlockTag {
    from.map(BlockTag::Number).unwrap_or(BlockTag::Latest)
}

pub async fn watch_ring_mined(config: &RelayConfig, from: Option<u64>) -> Result<()> {
    let sub = protocol(config)?.watch_ring_mined(from_tag(from), &config.watch).await?;
    print_events(sub, |e| {
        format!(
            "RingMined #{} {} miner={} orders={}{}",
            e.ring_index,
            e.ring_hash,
            e.miner,
            e.order_hashes.len(),
            if e.removed { " (removed)" } else { "" }
        )
    })
    .await
}

pub async fn watch_order_cancelled(config: &RelayConfig, from: Option<u64>) -> Result<()> {
    let sub = protocol(config)?.watch_order_cancelled(from_tag(from), &config.watch).await?;
    print_events(sub, |e| {
        format!(
            "OrderCancelled {} amount={}{}",
            e.order_hash,
            e.amount_cancelled,
            if e.removed { " (removed)" } else { "" }
        )
    })
    .await
}

async fn print_events<T: EventDecode>(
    mut sub: EventSubscription<T>,
    render: impl Fn(&T) -> String,
) -> Result<()> {
    info!(filter = %sub.filter_id(), "watching");
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            event = sub.next_event() => match event {
                Some(event) => println!("{}", render(&event)),
                None => break,
            },
        }
    }

    let report = sub.shutdown().await;
    println!(
        "Stopped ({:?}): {} delivered, {} poll errors, {} decode errors",
        report.reason, report.delivered, report.poll_errors, report.decode_errors
    );
    Ok(())
}
