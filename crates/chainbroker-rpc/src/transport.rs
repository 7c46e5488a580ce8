//! The `RpcTransport` trait: how JSON-RPC requests reach a node.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::request::{JsonRpcRequest, JsonRpcResponse};

/// Sends one request and returns the node's response.
///
/// Implementations must be `Send + Sync` and are stored as
/// `Arc<dyn RpcTransport>`. No retries happen at this layer.
#[async_trait]
pub trait RpcTransport: Send + Sync + 'static {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError>;

    /// Endpoint identifier for logs.
    fn url(&self) -> &str;
}
