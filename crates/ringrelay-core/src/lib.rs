//! ringrelay-core — data model and signing primitives for the ring relay.
//!
//! # Architecture
//!
//! ```text
//! Order ──(canonical hash, owner signature)──► OrderState
//!   │
//!   └─► FilledOrder ──► Ring ──(xor-fold hash, miner signature)──► RingSubmitInputs
//! ```
//!
//! Everything in this crate is pure data + crypto: no I/O, no async.
//! Signing keys are supplied by the environment through the [`Signer`] trait.

pub mod block;
pub mod crypto;
pub mod error;
pub mod order;
pub mod quantity;
pub mod ring;

pub use block::ObservedBlock;
pub use crypto::{Keystore, Signer, VrsSignature};
pub use error::SigningError;
pub use order::{FeeSelection, FilledOrder, Order, OrderState};
pub use ring::{Ring, RingSubmitInputs};

pub use alloy_primitives::{Address, B256, U256};
