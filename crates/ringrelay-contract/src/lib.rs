//! ringrelay-contract — turns a contract's JSON ABI into typed operations.
//!
//! # Overview
//!
//! - [`ContractAbi`] — immutable name → descriptor table built once at bind time
//! - [`Contract`] — `call`, `send_transaction`, and `subscribe` against one address
//! - [`EventSubscription`] — cancellable, bounded stream of decoded logs
//! - [`ProtocolContract`] — the ring-submission protocol bound to typed events
//!
//! Argument encoding errors surface before any request reaches the node; node
//! errors propagate unchanged with no retry.

pub mod binding;
pub mod codec;
pub mod contract;
pub mod error;
pub mod protocol;
pub mod transaction;
pub mod watch;

pub use binding::{ContractAbi, DecodedLog, EventDescriptor, MethodDescriptor};
pub use codec::{DecodeOutput, EventDecode};
pub use contract::Contract;
pub use error::{BindError, ContractError};
pub use protocol::{OrderCancelledEvent, ProtocolContract, RingMinedEvent};
pub use transaction::LegacyTransaction;
pub use watch::{EventSubscription, OverflowPolicy, StopReason, WatchConfig, WatchReport};

pub use alloy_dyn_abi::DynSolValue;
