//! ringrelay-rpc — node communication for the ring relay.
//!
//! - [`RpcTransport`] — the async trait every transport implements
//! - [`HttpTransport`] — JSON-RPC over HTTP via `reqwest`
//! - [`EthApi`] / [`EthClient`] — the typed `eth_*` subset the relay consumes
//!
//! Failures surface as [`TransportError`] and are never retried here; retry
//! policy belongs to the caller.

pub mod error;
pub mod eth;
pub mod http;
pub mod request;
pub mod transport;
pub mod types;

pub use error::TransportError;
pub use eth::{EthApi, EthClient};
pub use http::{HttpTransport, HttpTransportConfig};
pub use request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcId};
pub use transport::RpcTransport;
pub use types::{BlockTag, CallRequest, FilterQuery, Log, TransactionRequest};
