//! Order store seam used for duplicate detection and broadcast counters.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use alloy_primitives::B256;
use async_trait::async_trait;
use ringrelay_core::OrderState;

use crate::error::GatewayError;

/// Persistence for accepted orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn get(&self, hash: &B256) -> Result<Option<OrderState>, GatewayError>;

    /// Insert `state` unless an order with the same hash exists.
    ///
    /// Must be atomic: returns `false`, leaving the stored order untouched,
    /// when the hash is already present.
    async fn insert_if_absent(&self, state: OrderState) -> Result<bool, GatewayError>;

    async fn update_broadcast_count(&self, hash: &B256, count: u32) -> Result<(), GatewayError>;
}

/// In-memory [`OrderStore`].
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: Mutex<HashMap<B256, OrderState>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.orders().len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders().is_empty()
    }

    fn orders(&self) -> MutexGuard<'_, HashMap<B256, OrderState>> {
        self.orders.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn get(&self, hash: &B256) -> Result<Option<OrderState>, GatewayError> {
        Ok(self.orders().get(hash).cloned())
    }

    async fn insert_if_absent(&self, state: OrderState) -> Result<bool, GatewayError> {
        match self.orders().entry(state.hash()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(state);
                Ok(true)
            }
        }
    }

    async fn update_broadcast_count(&self, hash: &B256, count: u32) -> Result<(), GatewayError> {
        let mut orders = self.orders();
        let state = orders
            .get_mut(hash)
            .ok_or_else(|| GatewayError::Store { reason: format!("order {hash} not found") })?;
        state.broadcast_count = count;
        Ok(())
    }
}
