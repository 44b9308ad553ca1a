//! Polling event subscriptions.
//!
//! Each subscription owns one installed log filter and one background task.
//! The task polls `eth_getFilterChanges` on a fixed interval, decodes every
//! log, and forwards it on a bounded channel. Poll and decode errors are
//! logged and the loop keeps going. The stop signal is checked once per tick,
//! and on exit the task uninstalls its filter and reports what it did.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use alloy_primitives::U256;
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use ringrelay_rpc::EthApi;

use crate::binding::EventDescriptor;
use crate::codec::EventDecode;

/// What the poll loop does when the consumer is not draining the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Wait for capacity. Delivery for this subscription stalls until the
    /// consumer catches up; the stop signal still interrupts the wait.
    #[default]
    Block,
    /// End the subscription with [`StopReason::Overflow`].
    Fail,
}

/// Poll loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Decoded events buffered between the poll loop and the consumer.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default)]
    pub overflow: OverflowPolicy,
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_channel_capacity() -> usize {
    256
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            channel_capacity: default_channel_capacity(),
            overflow: OverflowPolicy::default(),
        }
    }
}

impl WatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Why a poll loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// [`EventSubscription::shutdown`] was called or the handle was dropped.
    Cancelled,
    /// The consumer side of the channel was closed.
    ReceiverClosed,
    /// The channel was full under [`OverflowPolicy::Fail`].
    Overflow,
}

/// Shutdown acknowledgement returned by [`EventSubscription::shutdown`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchReport {
    pub filter_id: U256,
    pub reason: StopReason,
    pub delivered: u64,
    pub poll_errors: u64,
    pub decode_errors: u64,
    /// `true` if the node acknowledged `eth_uninstallFilter`.
    pub uninstalled: bool,
}

/// A live subscription: a stream of decoded events plus its stop handle.
pub struct EventSubscription<T> {
    filter_id: U256,
    rx: mpsc::Receiver<T>,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<WatchReport>,
}

impl<T: EventDecode> EventSubscription<T> {
    /// Start polling an already-installed filter.
    pub(crate) fn spawn(
        client: Arc<dyn EthApi>,
        event: Arc<EventDescriptor>,
        filter_id: U256,
        config: &WatchConfig,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
        let (stop_tx, stop_rx) = oneshot::channel();
        let poller = Poller {
            client,
            event,
            filter_id,
            interval: config.poll_interval(),
            overflow: config.overflow,
            tx,
        };
        let task = tokio::spawn(poller.run(stop_rx));
        Self { filter_id, rx, stop: Some(stop_tx), task }
    }
}

impl<T> EventSubscription<T> {
    pub fn filter_id(&self) -> U256 {
        self.filter_id
    }

    /// Next decoded event; `None` once the poll loop has ended and the
    /// buffer is drained.
    pub async fn next_event(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Signal the loop to stop and wait for it to uninstall the filter.
    ///
    /// Latency is bounded by one poll tick. Events still buffered are dropped.
    pub async fn shutdown(mut self) -> WatchReport {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        match (&mut self.task).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(filter_id = %self.filter_id, error = %e, "watch task panicked");
                WatchReport {
                    filter_id: self.filter_id,
                    reason: StopReason::Cancelled,
                    delivered: 0,
                    poll_errors: 0,
                    decode_errors: 0,
                    uninstalled: false,
                }
            }
        }
    }
}

impl<T> Stream for EventSubscription<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

// ─── Poll loop ────────────────────────────────────────────────────────────────

struct Poller<T> {
    client: Arc<dyn EthApi>,
    event: Arc<EventDescriptor>,
    filter_id: U256,
    interval: Duration,
    overflow: OverflowPolicy,
    tx: mpsc::Sender<T>,
}

impl<T: EventDecode> Poller<T> {
    async fn run(self, mut stop: oneshot::Receiver<()>) -> WatchReport {
        let mut delivered = 0u64;
        let mut poll_errors = 0u64;
        let mut decode_errors = 0u64;
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let reason = 'poll: loop {
            tokio::select! {
                biased;
                _ = &mut stop => break 'poll StopReason::Cancelled,
                _ = ticker.tick() => {}
            }

            let logs = match self.client.get_filter_changes(self.filter_id).await {
                Ok(logs) => logs,
                Err(e) => {
                    poll_errors += 1;
                    tracing::error!(
                        event = %self.event.name(),
                        filter_id = %self.filter_id,
                        error = %e,
                        "filter poll failed"
                    );
                    continue;
                }
            };

            for log in logs {
                let item = match self.event.decode_log(&log).and_then(T::decode_event) {
                    Ok(item) => item,
                    Err(e) => {
                        decode_errors += 1;
                        tracing::error!(
                            event = %self.event.name(),
                            tx = ?log.transaction_hash,
                            error = %e,
                            "event decode failed"
                        );
                        continue;
                    }
                };

                match self.overflow {
                    OverflowPolicy::Block => {
                        tokio::select! {
                            biased;
                            _ = &mut stop => break 'poll StopReason::Cancelled,
                            sent = self.tx.send(item) => {
                                if sent.is_err() {
                                    break 'poll StopReason::ReceiverClosed;
                                }
                            }
                        }
                    }
                    OverflowPolicy::Fail => match self.tx.try_send(item) {
                        Ok(()) => {}
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            tracing::warn!(
                                event = %self.event.name(),
                                filter_id = %self.filter_id,
                                "subscription buffer full, stopping"
                            );
                            break 'poll StopReason::Overflow;
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => {
                            break 'poll StopReason::ReceiverClosed;
                        }
                    },
                }
                delivered += 1;
            }
        };

        let uninstalled = match self.client.uninstall_filter(self.filter_id).await {
            Ok(ack) => ack,
            Err(e) => {
                tracing::warn!(filter_id = %self.filter_id, error = %e, "uninstall filter failed");
                false
            }
        };
        tracing::info!(
            event = %self.event.name(),
            filter_id = %self.filter_id,
            ?reason,
            delivered,
            "event subscription stopped"
        );

        WatchReport { filter_id: self.filter_id, reason, delivered, poll_errors, decode_errors, uninstalled }
    }
}
