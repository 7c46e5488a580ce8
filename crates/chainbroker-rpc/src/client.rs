//! Typed chain queries over a JSON-RPC transport.

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::TransportError;
use crate::http::HttpRpcClient;
use crate::request::JsonRpcRequest;
use crate::transport::RpcTransport;
use crate::types::{BlockHeader, TransactionInfo, TransactionReceipt, WireBlock, WireReceipt, WireTransaction};

/// The chain queries the engine needs. Every call reads the latest state.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// `None` until the transaction is mined.
    async fn get_transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionReceipt>, TransportError>;

    async fn get_transaction(&self, hash: B256) -> Result<Option<TransactionInfo>, TransportError>;

    async fn get_block_number(&self) -> Result<u64, TransportError>;

    async fn get_block(&self, number: u64) -> Result<Option<BlockHeader>, TransportError>;

    /// Read-only call against the latest block.
    async fn eth_call(&self, to: Address, data: Bytes) -> Result<Bytes, TransportError>;

    async fn get_storage_at(&self, address: Address, slot: B256) -> Result<B256, TransportError>;

    /// Runtime bytecode; empty when nothing is deployed at `address`.
    async fn get_code(&self, address: Address) -> Result<Bytes, TransportError>;
}

/// `ChainRpc` over any `RpcTransport`.
pub struct JsonRpcChain {
    transport: Arc<dyn RpcTransport>,
    next_id: AtomicU64,
}

impl JsonRpcChain {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self {
            transport,
            next_id: AtomicU64::new(1),
        }
    }

    /// Plain HTTP endpoint with a per-request timeout.
    pub fn http(url: &str, timeout: Duration) -> Result<Self, TransportError> {
        Ok(Self::new(Arc::new(HttpRpcClient::new(url, timeout)?)))
    }

    pub fn url(&self) -> &str {
        self.transport.url()
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(method, id, url = %self.transport.url(), "rpc request");
        let resp = self
            .transport
            .send(JsonRpcRequest::new(id, method, params))
            .await?;
        let result = resp.into_result()?;
        Ok(serde_json::from_value(result)?)
    }
}

#[async_trait]
impl ChainRpc for JsonRpcChain {
    async fn get_transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionReceipt>, TransportError> {
        let wire: Option<WireReceipt> = self
            .request("eth_getTransactionReceipt", vec![json!(hash)])
            .await?;
        Ok(wire.and_then(WireReceipt::into_receipt))
    }

    async fn get_transaction(&self, hash: B256) -> Result<Option<TransactionInfo>, TransportError> {
        let wire: Option<WireTransaction> = self
            .request("eth_getTransactionByHash", vec![json!(hash)])
            .await?;
        Ok(wire.map(TransactionInfo::from))
    }

    async fn get_block_number(&self) -> Result<u64, TransportError> {
        let n: alloy_primitives::U64 = self.request("eth_blockNumber", vec![]).await?;
        Ok(n.to::<u64>())
    }

    async fn get_block(&self, number: u64) -> Result<Option<BlockHeader>, TransportError> {
        let wire: Option<WireBlock> = self
            .request(
                "eth_getBlockByNumber",
                vec![json!(format!("{number:#x}")), json!(false)],
            )
            .await?;
        Ok(wire.map(BlockHeader::from))
    }

    async fn eth_call(&self, to: Address, data: Bytes) -> Result<Bytes, TransportError> {
        self.request(
            "eth_call",
            vec![json!({ "to": to, "data": data }), json!("latest")],
        )
        .await
    }

    async fn get_storage_at(&self, address: Address, slot: B256) -> Result<B256, TransportError> {
        let raw: Bytes = self
            .request(
                "eth_getStorageAt",
                vec![json!(address), json!(slot), json!("latest")],
            )
            .await?;
        if raw.len() > 32 {
            return Err(TransportError::Malformed(format!(
                "storage word of {} bytes",
                raw.len()
            )));
        }
        Ok(B256::left_padding_from(&raw))
    }

    async fn get_code(&self, address: Address) -> Result<Bytes, TransportError> {
        self.request("eth_getCode", vec![json!(address), json!("latest")])
            .await
    }
}
