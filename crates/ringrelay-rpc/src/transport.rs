//! The `RpcTransport` trait — the seam between typed clients and the wire.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::request::{JsonRpcRequest, JsonRpcResponse};

/// Sends one JSON-RPC request and returns the node's response.
///
/// Implementations must be `Send + Sync` and are stored as
/// `Arc<dyn RpcTransport>` by [`EthClient`](crate::EthClient).
#[async_trait]
pub trait RpcTransport: Send + Sync + 'static {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError>;

    /// Endpoint identifier (URL or name), used in logs.
    fn url(&self) -> &str;
}
