//! JSON-RPC 2.0 envelopes as the broker sends and reads them.
//!
//! Requests are numbered per client. Responses are matched by the HTTP
//! exchange rather than by id, so the echoed id is not kept.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TransportError;

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    pub params: Vec<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method: method.into(),
            params,
        }
    }
}

/// The error object of a failed call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    /// Revert payload on `eth_call`, free-form otherwise
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(result: Value) -> Self {
        Self {
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(error: JsonRpcError) -> Self {
        Self {
            result: None,
            error: Some(error),
        }
    }

    /// The result (`null` when absent) or the node's error, classified.
    pub fn into_result(self) -> Result<Value, TransportError> {
        match self.error {
            Some(err) => Err(err.into()),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}
