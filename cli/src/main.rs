//! RingRelay CLI.
//!
//! # Commands
//! ```text
//! ringrelay info
//! ringrelay order-hash  --file <order.json>
//! ringrelay admit       --file <order.json>
//! ringrelay ring        --file <ring.json> [--fee-recipient <addr>] [--send]
//! ringrelay index       status | block --hash <h> | tx --block <h> --tx <h>
//! ringrelay follow      [--from <n>]
//! ringrelay watch       --event ring-mined|order-cancelled [--from <n>]
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

mod cmd_chain;
mod cmd_order;
mod config;
mod telemetry;

use config::RelayConfig;

#[derive(Parser)]
#[command(
    name = "ringrelay",
    about = "RingRelay: order admission, ring submission, and chain-state indexing",
    version
)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show build and capability info
    Info,

    /// Print an order's canonical hash and recovered signer
    #[command(name = "order-hash")]
    OrderHash {
        /// Order JSON (wire form)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Run an order through the admission filters configured in `gateway`
    Admit {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Sign a ring with its miner key and print the submitRing call
    Ring {
        /// Ring JSON: { "orders": [...], "miner": "0x..." }
        #[arg(short, long)]
        file: PathBuf,
        /// Fee recipient; defaults to the miner
        #[arg(long)]
        fee_recipient: Option<String>,
        /// Submit the transaction to the configured node
        #[arg(long)]
        send: bool,
    },

    /// Inspect the chain-state index
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },

    /// Follow new blocks from the node into the index until Ctrl-C
    Follow {
        /// First block to record; defaults to cursor + 1, or the node head
        #[arg(long)]
        from: Option<u64>,
    },

    /// Print protocol events until Ctrl-C
    Watch {
        #[arg(long, value_enum)]
        event: WatchedEvent,
        /// First block of the filter; defaults to latest
        #[arg(long)]
        from: Option<u64>,
    },
}

#[derive(Subcommand)]
enum IndexAction {
    /// Show the cursor
    Status,
    /// Show a stored block header
    Block {
        #[arg(long)]
        hash: String,
    },
    /// Check whether a transaction is recorded under a block
    Tx {
        #[arg(long)]
        block: String,
        #[arg(long)]
        tx: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum WatchedEvent {
    RingMined,
    OrderCancelled,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = RelayConfig::load(cli.config.as_deref())?;

    let mut log = config.log.clone();
    if cli.verbose {
        log.level = "debug".into();
    }
    telemetry::init_tracing(&log);

    match cli.command {
        Commands::Info => cmd_info(&config),
        Commands::OrderHash { file } => cmd_order::hash(&file),
        Commands::Admit { file } => cmd_order::admit(&config, &file).await,
        Commands::Ring { file, fee_recipient, send } => {
            cmd_order::ring(&config, &file, fee_recipient.as_deref(), send).await
        }
        Commands::Index { action } => match action {
            IndexAction::Status => cmd_chain::index_status(&config).await,
            IndexAction::Block { hash } => cmd_chain::index_block(&config, &hash).await,
            IndexAction::Tx { block, tx } => cmd_chain::index_tx(&config, &block, &tx).await,
        },
        Commands::Follow { from } => cmd_chain::follow(&config, from).await,
        Commands::Watch { event, from } => match event {
            WatchedEvent::RingMined => cmd_chain::watch_ring_mined(&config, from).await,
            WatchedEvent::OrderCancelled => cmd_chain::watch_order_cancelled(&config, from).await,
        },
    }
}

fn cmd_info(config: &RelayConfig) -> Result<()> {
    println!("ringrelay {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Admission filters: structural, signature, token");
    println!("Index backend:     sqlite ({})", config.index.db.display());
    println!("Signing:           secp256k1, personal-message digest, EIP-155 transactions");
    match &config.node {
        Some(node) => println!("Node:              {}", node.url),
        None => println!("Node:              (not configured)"),
    }
    if let Some(addr) = config.protocol_address {
        println!("Protocol:          {addr}");
    }
    Ok(())
}
