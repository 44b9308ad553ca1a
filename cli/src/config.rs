//! `ringrelay` configuration file.
//!
//! ```json
//! {
//!   "log":     { "level": "info", "json": false },
//!   "node":    { "url": "http://127.0.0.1:8545" },
//!   "chainId": 1,
//!   "protocolAddress": "0x...",
//!   "keyFile": "./keys.txt",
//!   "gateway": { "min_fee": "0x1", "allow_tokens": ["0x..."] },
//!   "index":   { "db": "./ringrelay-index.db", "max_reorg_depth": 64 },
//!   "watch":   { "poll_interval_ms": 1000 }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use alloy_primitives::Address;
use anyhow::{anyhow, Context, Result};
use ringrelay_contract::WatchConfig;
use ringrelay_core::Keystore;
use ringrelay_gateway::GatewayConfig;
use ringrelay_index::sqlite::SqliteKvStore;
use ringrelay_index::{ChainStateIndex, IndexConfig};
use ringrelay_rpc::{EthClient, HttpTransport, HttpTransportConfig};
use serde::{Deserialize, Serialize};

use crate::telemetry::LogConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayConfig {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub node: Option<HttpTransportConfig>,
    /// EIP-155 chain id used when signing transactions locally.
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    #[serde(default)]
    pub protocol_address: Option<Address>,
    /// Protocol ABI JSON; the built-in `submitRing` subset when absent.
    #[serde(default)]
    pub protocol_abi: Option<PathBuf>,
    /// File of hex secret keys, one per line.
    #[serde(default)]
    pub key_file: Option<PathBuf>,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub index: IndexSettings,
    #[serde(default)]
    pub watch: WatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSettings {
    #[serde(default = "default_db")]
    pub db: PathBuf,
    #[serde(flatten)]
    pub config: IndexConfig,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self { db: default_db(), config: IndexConfig::default() }
    }
}

fn default_chain_id() -> u64 {
    1
}

fn default_db() -> PathBuf {
    PathBuf::from("ringrelay-index.db")
}

impl RelayConfig {
    /// Read `path`, or fall back to defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self { chain_id: default_chain_id(), ..Self::default() });
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn node_client(&self) -> Result<Arc<EthClient>> {
        let node = self
            .node
            .clone()
            .ok_or_else(|| anyhow!("no node configured (set \"node\": {{\"url\": ...}})"))?;
        let transport = HttpTransport::new(node)?;
        Ok(Arc::new(EthClient::new(Arc::new(transport))))
    }

    pub fn protocol_address(&self) -> Result<Address> {
        self.protocol_address.ok_or_else(|| anyhow!("protocolAddress is not configured"))
    }

    pub fn protocol_abi(&self) -> Result<String> {
        match &self.protocol_abi {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("reading ABI {}", path.display())),
            None => Ok(ringrelay_contract::protocol::PROTOCOL_ABI.to_string()),
        }
    }

    pub fn keystore(&self) -> Result<Keystore> {
        let mut keys = Keystore::new();
        if let Some(path) = &self.key_file {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading key file {}", path.display()))?;
            for line in text.lines().map(str::trim).filter(|l| !l.is_empty() && !l.starts_with('#')) {
                keys.insert_hex(line)?;
            }
        }
        Ok(keys)
    }

    pub async fn open_index(&self) -> Result<ChainStateIndex> {
        let path = self.index.db.to_string_lossy();
        let store = SqliteKvStore::open(&path).await?;
        Ok(ChainStateIndex::new(Arc::new(store), self.index.config.clone()))
    }
}
