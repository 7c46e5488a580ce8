//! # chainbroker-rpc
//!
//! How the engine reaches a chain: JSON-RPC wire types, the
//! `RpcTransport` abstraction with a `reqwest` HTTP implementation, the
//! typed `ChainRpc` query surface, and per-project endpoint selection.

pub mod client;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod request;
pub mod transport;
pub mod types;

pub use client::{ChainRpc, JsonRpcChain};
pub use endpoint::{ChainConfig, ChainEndpoint, EndpointConfig, EndpointResolver};
pub use error::TransportError;
pub use http::HttpRpcClient;
pub use request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use transport::RpcTransport;
pub use types::{BlockHeader, TransactionInfo, TransactionReceipt};
