//! Bounded, observable broadcast of accepted orders.
//!
//! Each broadcast is one attempt: a failure is logged and not retried.
//! The broadcast limit is enforced by the caller comparing the stored
//! count before submitting (see [`Gateway`](crate::Gateway)).

use std::sync::Arc;

use async_trait::async_trait;
use ringrelay_core::{Order, OrderState};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::error::GatewayError;
use crate::store::OrderStore;

/// Publishes an order to peers (IPFS pub-sub, gossip, HTTP relay).
#[async_trait]
pub trait OrderPublisher: Send + Sync {
    async fn publish(&self, order: &Order) -> Result<(), GatewayError>;
}

/// What happened to one broadcast attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastOutcome {
    /// Published; the stored count is now `count`.
    Published { count: u32 },
    /// Publishing (or the count update) failed.
    Failed { reason: String },
}

/// Runs broadcasts on background tasks with at most `workers` in flight.
/// Submissions beyond that are dropped, never queued.
#[derive(Clone)]
pub struct BroadcastPool {
    publisher: Arc<dyn OrderPublisher>,
    store: Arc<dyn OrderStore>,
    permits: Arc<Semaphore>,
}

impl BroadcastPool {
    pub fn new(publisher: Arc<dyn OrderPublisher>, store: Arc<dyn OrderStore>, workers: usize) -> Self {
        Self { publisher, store, permits: Arc::new(Semaphore::new(workers.max(1))) }
    }

    /// Publish `state.order` in the background. On success the stored
    /// broadcast count becomes `state.broadcast_count + 1`.
    ///
    /// Returns `None` without spawning when every worker is busy; the order
    /// stays admitted with its count unchanged.
    pub fn submit(&self, state: OrderState) -> Option<JoinHandle<BroadcastOutcome>> {
        let hash = state.hash();
        let permit = match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => permit,
            Err(e) => {
                warn!(order = %hash, error = %e, "broadcast pool saturated, skipping broadcast");
                return None;
            }
        };
        let publisher = Arc::clone(&self.publisher);
        let store = Arc::clone(&self.store);

        Some(tokio::spawn(async move {
            let _permit = permit;

            if let Err(e) = publisher.publish(&state.order).await {
                error!(order = %hash, error = %e, "broadcast failed");
                return BroadcastOutcome::Failed { reason: e.to_string() };
            }

            let count = state.broadcast_count + 1;
            match store.update_broadcast_count(&hash, count).await {
                Ok(()) => {
                    debug!(order = %hash, count, "broadcast order");
                    BroadcastOutcome::Published { count }
                }
                Err(e) => {
                    error!(order = %hash, error = %e, "failed to record broadcast");
                    BroadcastOutcome::Failed { reason: e.to_string() }
                }
            }
        }))
    }

    /// Broadcasts that could start right now without waiting.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

impl std::fmt::Debug for BroadcastPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastPool").field("available", &self.available()).finish_non_exhaustive()
    }
}
