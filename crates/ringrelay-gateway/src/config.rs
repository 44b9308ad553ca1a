//! Gateway configuration.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Settings for [`Gateway`](crate::Gateway).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Orders must pay strictly more than this fee.
    #[serde(default)]
    pub min_fee: U256,
    /// Sell tokens accepted by the token filter.
    #[serde(default)]
    pub allow_tokens: Vec<Address>,
    /// Sell tokens refused even when allowed.
    #[serde(default)]
    pub deny_tokens: Vec<Address>,
    /// Publish accepted orders to peers.
    #[serde(default)]
    pub broadcast: bool,
    /// Stop publishing an order once it has been published this many times.
    #[serde(default = "default_max_broadcast_count")]
    pub max_broadcast_count: u32,
    /// Concurrent publishes in flight.
    #[serde(default = "default_broadcast_workers")]
    pub broadcast_workers: usize,
    /// Buffered accepted-order events per subscriber.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_max_broadcast_count() -> u32 {
    3
}

fn default_broadcast_workers() -> usize {
    4
}

fn default_event_capacity() -> usize {
    1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            min_fee: U256::ZERO,
            allow_tokens: Vec::new(),
            deny_tokens: Vec::new(),
            broadcast: false,
            max_broadcast_count: default_max_broadcast_count(),
            broadcast_workers: default_broadcast_workers(),
            event_capacity: default_event_capacity(),
        }
    }
}
