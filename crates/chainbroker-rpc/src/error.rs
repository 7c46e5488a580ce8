//! Failures reaching or querying a chain node.
//!
//! The engine branches on two questions only: did the call itself revert
//! (an answer, for proxy probing), and may the same query succeed later
//! (a transient failure, for status resolution). The variants are shaped
//! around those.

use alloy_primitives::Bytes;
use thiserror::Error;

use crate::request::JsonRpcError;

/// EIP-1474 code for a reverted `eth_call` / `eth_estimateGas`.
const EXECUTION_ERROR_CODE: i64 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection refused, non-2xx status or a body that never arrived.
    #[error("node unreachable: {0}")]
    Unreachable(String),

    #[error("node at {url} is rate limiting requests")]
    RateLimited { url: String },

    #[error("no answer within {ms}ms")]
    Timeout { ms: u64 },

    /// The call ran and reverted. `data` is the raw revert payload when
    /// the node passes it on.
    #[error("execution reverted{}", reason_suffix(.reason))]
    Reverted {
        reason: Option<String>,
        data: Option<Bytes>,
    },

    /// Any other JSON-RPC error object: unknown block, pruned state,
    /// provider limits.
    #[error("node error {code}: {message}")]
    Node { code: i64, message: String },

    /// The answer did not have the shape the query expects.
    #[error("unexpected response: {0}")]
    Malformed(String),
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default()
}

impl TransportError {
    /// `true` when asking again later may give an answer.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Unreachable(_) | Self::RateLimited { .. } | Self::Timeout { .. } | Self::Node { .. }
        )
    }

    /// `true` when the node executed the call and it reverted.
    pub fn is_revert(&self) -> bool {
        matches!(self, Self::Reverted { .. })
    }
}

impl From<JsonRpcError> for TransportError {
    /// Sorts a node's error object into a revert or a node-side failure.
    /// Nodes disagree on codes, so the message is consulted as well.
    fn from(err: JsonRpcError) -> Self {
        let message = err.message.to_lowercase();
        let reverted = err.code == EXECUTION_ERROR_CODE
            || message.contains("execution reverted")
            || message.contains("invalid opcode");
        if !reverted {
            return Self::Node {
                code: err.code,
                message: err.message,
            };
        }
        let reason = err
            .message
            .split_once(": ")
            .map(|(_, reason)| reason.trim().to_string())
            .filter(|reason| !reason.is_empty());
        let data = err
            .data
            .and_then(|value| serde_json::from_value::<Bytes>(value).ok());
        Self::Reverted { reason, data }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}
