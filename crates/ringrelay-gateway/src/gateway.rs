//! The admission gateway instance.

use std::sync::Arc;

use ringrelay_core::{Order, OrderState};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::broadcast::{BroadcastOutcome, BroadcastPool, OrderPublisher};
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::filter::{Filter, SignatureFilter, StructuralFilter, TokenFilter};
use crate::request::OrderRequest;
use crate::store::OrderStore;

/// An accepted order and, if one was started, its broadcast.
#[derive(Debug)]
pub struct Admission {
    pub state: OrderState,
    pub broadcast: Option<JoinHandle<BroadcastOutcome>>,
}

/// Admission gateway. Construct one per relay and share it by reference.
pub struct Gateway {
    config: GatewayConfig,
    filters: Vec<Box<dyn Filter>>,
    store: Arc<dyn OrderStore>,
    accepted: broadcast::Sender<OrderState>,
    broadcaster: Option<BroadcastPool>,
}

impl Gateway {
    /// Gateway with the standard chain: structural, signature, token policy.
    pub fn new(config: GatewayConfig, store: Arc<dyn OrderStore>) -> Self {
        let filters: Vec<Box<dyn Filter>> = vec![
            Box::new(StructuralFilter { min_fee: config.min_fee }),
            Box::new(SignatureFilter),
            Box::new(TokenFilter::new(
                config.allow_tokens.iter().copied(),
                config.deny_tokens.iter().copied(),
            )),
        ];
        Self::with_filters(config, store, filters)
    }

    /// Gateway with a caller-supplied chain, run in the given order.
    pub fn with_filters(
        config: GatewayConfig,
        store: Arc<dyn OrderStore>,
        filters: Vec<Box<dyn Filter>>,
    ) -> Self {
        let (accepted, _) = broadcast::channel(config.event_capacity.max(1));
        Self { config, filters, store, accepted, broadcaster: None }
    }

    /// Attach a publisher. Broadcasts still require `config.broadcast`.
    pub fn with_publisher(mut self, publisher: Arc<dyn OrderPublisher>) -> Self {
        self.broadcaster = Some(BroadcastPool::new(
            publisher,
            Arc::clone(&self.store),
            self.config.broadcast_workers,
        ));
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn filter_names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Accepted-order events, for the matcher.
    pub fn subscribe(&self) -> broadcast::Receiver<OrderState> {
        self.accepted.subscribe()
    }

    /// Decode a wire-form order and admit it.
    pub async fn ingest_request(&self, request: &OrderRequest) -> Result<Admission, GatewayError> {
        let order = request.decode().map_err(|r| {
            warn!(filter = r.filter(), reason = %r, "order rejected");
            r
        })?;
        self.ingest(order).await
    }

    /// Admit a signed order: recompute its hash, reject duplicates, run the
    /// filter chain, store it, and announce it.
    pub async fn ingest(&self, mut order: Order) -> Result<Admission, GatewayError> {
        order.hash = order.generate_hash();
        let hash = order.hash;

        if self.store.get(&hash).await?.is_some() {
            debug!(order = %hash, "duplicate order");
            return Err(GatewayError::Duplicate { hash });
        }

        for filter in &self.filters {
            if let Err(rejection) = filter.check(&order) {
                warn!(order = %hash, filter = filter.name(), reason = %rejection, "order rejected");
                return Err(rejection.into());
            }
        }

        let state = OrderState::new(order);
        if !self.store.insert_if_absent(state.clone()).await? {
            debug!(order = %hash, "duplicate order lost insert race");
            return Err(GatewayError::Duplicate { hash });
        }

        debug!(
            order = %hash,
            amount_s = %state.order.amount_s,
            amount_b = %state.order.amount_b,
            "accepted order"
        );
        // no subscribers is not an error
        let _ = self.accepted.send(state.clone());

        let broadcast = self.broadcast(&state);
        Ok(Admission { state, broadcast })
    }

    fn broadcast(&self, state: &OrderState) -> Option<JoinHandle<BroadcastOutcome>> {
        if !self.config.broadcast || state.broadcast_count >= self.config.max_broadcast_count {
            return None;
        }
        self.broadcaster.as_ref().and_then(|pool| pool.submit(state.clone()))
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("filters", &self.filter_names())
            .field("broadcaster", &self.broadcaster)
            .finish_non_exhaustive()
    }
}
