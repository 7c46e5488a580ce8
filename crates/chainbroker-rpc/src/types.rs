//! Chain data as the engine consumes it, and the node's JSON shapes it is
//! parsed from. Quantities arrive as hex strings.

use alloy_primitives::{Address, Bytes, B256, U256, U64};
use chainbroker_core::RawLog;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    pub block_number: u64,
    /// Execution status; receipts from before status codes existed count
    /// as successful
    pub success: bool,
    pub from: Address,
    pub to: Option<Address>,
    pub contract_address: Option<Address>,
    pub logs: Vec<RawLog>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInfo {
    pub hash: B256,
    pub from: Address,
    pub to: Option<Address>,
    pub input: Bytes,
    pub value: U256,
    pub block_number: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub number: u64,
    /// Seconds since the Unix epoch
    pub timestamp: u64,
}

// ─── wire shapes ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireLog {
    address: Address,
    #[serde(default)]
    topics: Vec<B256>,
    #[serde(default)]
    data: Bytes,
    log_index: Option<U64>,
}

impl From<WireLog> for RawLog {
    fn from(w: WireLog) -> Self {
        RawLog {
            address: w.address,
            topics: w.topics,
            data: w.data,
            log_index: w.log_index.map(|i| i.to::<u64>()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireReceipt {
    transaction_hash: B256,
    block_number: Option<U64>,
    status: Option<U64>,
    from: Address,
    to: Option<Address>,
    contract_address: Option<Address>,
    #[serde(default)]
    logs: Vec<WireLog>,
}

impl WireReceipt {
    /// `None` while the receipt has no block yet.
    pub(crate) fn into_receipt(self) -> Option<TransactionReceipt> {
        Some(TransactionReceipt {
            transaction_hash: self.transaction_hash,
            block_number: self.block_number?.to::<u64>(),
            success: self.status.map_or(true, |s| s == U64::from(1u64)),
            from: self.from,
            to: self.to,
            contract_address: self.contract_address,
            logs: self.logs.into_iter().map(RawLog::from).collect(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireTransaction {
    hash: B256,
    from: Address,
    to: Option<Address>,
    #[serde(default)]
    input: Bytes,
    #[serde(default)]
    value: U256,
    block_number: Option<U64>,
}

impl From<WireTransaction> for TransactionInfo {
    fn from(w: WireTransaction) -> Self {
        TransactionInfo {
            hash: w.hash,
            from: w.from,
            to: w.to,
            input: w.input,
            value: w.value,
            block_number: w.block_number.map(|n| n.to::<u64>()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireBlock {
    number: U64,
    timestamp: U64,
}

impl From<WireBlock> for BlockHeader {
    fn from(w: WireBlock) -> Self {
        BlockHeader {
            number: w.number.to::<u64>(),
            timestamp: w.timestamp.to::<u64>(),
        }
    }
}
