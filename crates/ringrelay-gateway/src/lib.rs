//! ringrelay-gateway — admission control for incoming signed orders.
//!
//! # Pipeline
//!
//! ```text
//! OrderRequest ──decode──► Order ──hash──► duplicate check ──► filter chain
//!                                                                 │
//!            broadcast pool ◄── OrderState ──► store + accepted-order channel
//! ```
//!
//! Filters run in a fixed order (structural, signature, token policy) and
//! the first rejection wins. Accepted orders are inserted with an atomic
//! check-and-set so two concurrent copies of one order cannot both pass.

pub mod broadcast;
pub mod config;
pub mod error;
pub mod filter;
pub mod gateway;
pub mod request;
pub mod store;

pub use broadcast::{BroadcastOutcome, BroadcastPool, OrderPublisher};
pub use config::GatewayConfig;
pub use error::{GatewayError, Rejection};
pub use filter::{Filter, SignatureFilter, StructuralFilter, TokenFilter};
pub use gateway::{Admission, Gateway};
pub use request::OrderRequest;
pub use store::{InMemoryOrderStore, OrderStore};
