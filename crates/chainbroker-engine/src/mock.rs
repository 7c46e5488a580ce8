//! In-memory chain for tests and offline tooling.
//!
//! Everything the engine can ask a node is settable, and each query is
//! counted so tests can assert what was (or was not) asked.

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use chainbroker_rpc::{BlockHeader, ChainRpc, TransactionInfo, TransactionReceipt, TransportError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// A scriptable [`ChainRpc`].
#[derive(Default)]
pub struct MockChain {
    block_number: AtomicU64,
    receipts: Mutex<HashMap<B256, TransactionReceipt>>,
    transactions: Mutex<HashMap<B256, TransactionInfo>>,
    blocks: Mutex<HashMap<u64, BlockHeader>>,
    storage: Mutex<HashMap<(Address, B256), B256>>,
    code: Mutex<HashMap<Address, Bytes>>,
    calls: Mutex<HashMap<(Address, Bytes), Result<Bytes, TransportError>>>,
    offline: AtomicBool,
    queries: AtomicUsize,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_block_number(&self, number: u64) {
        self.block_number.store(number, Ordering::SeqCst);
    }

    /// Adds the receipt and, when missing, a block header for its block.
    pub fn insert_receipt(&self, receipt: TransactionReceipt) {
        let number = receipt.block_number;
        lock(&self.blocks).entry(number).or_insert(BlockHeader {
            number,
            timestamp: 1_700_000_000 + number * 12,
        });
        lock(&self.receipts).insert(receipt.transaction_hash, receipt);
    }

    pub fn insert_transaction(&self, tx: TransactionInfo) {
        lock(&self.transactions).insert(tx.hash, tx);
    }

    pub fn insert_block(&self, header: BlockHeader) {
        lock(&self.blocks).insert(header.number, header);
    }

    pub fn set_storage(&self, address: Address, slot: B256, value: B256) {
        lock(&self.storage).insert((address, slot), value);
    }

    pub fn set_code(&self, address: Address, code: impl Into<Bytes>) {
        lock(&self.code).insert(address, code.into());
    }

    /// Scripts the result of `eth_call(to, data)`.
    pub fn set_call_result(&self, to: Address, data: impl Into<Bytes>, result: impl Into<Bytes>) {
        lock(&self.calls).insert((to, data.into()), Ok(result.into()));
    }

    /// Scripts `eth_call(to, data)` to revert.
    pub fn set_call_revert(&self, to: Address, data: impl Into<Bytes>, reason: &str) {
        let revert = TransportError::Reverted {
            reason: Some(reason.to_string()),
            data: None,
        };
        lock(&self.calls).insert((to, data.into()), Err(revert));
    }

    /// Scripts `eth_call(to, data)` to fail with `error`, e.g. a node-side
    /// `TransportError::Node`.
    pub fn set_call_error(&self, to: Address, data: impl Into<Bytes>, error: TransportError) {
        lock(&self.calls).insert((to, data.into()), Err(error));
    }

    /// While offline every query fails with a timeout.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of queries answered or refused so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<(), TransportError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(TransportError::Timeout { ms: 10_000 });
        }
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl ChainRpc for MockChain {
    async fn get_transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionReceipt>, TransportError> {
        self.enter()?;
        Ok(lock(&self.receipts).get(&hash).cloned())
    }

    async fn get_transaction(&self, hash: B256) -> Result<Option<TransactionInfo>, TransportError> {
        self.enter()?;
        Ok(lock(&self.transactions).get(&hash).cloned())
    }

    async fn get_block_number(&self) -> Result<u64, TransportError> {
        self.enter()?;
        Ok(self.block_number.load(Ordering::SeqCst))
    }

    async fn get_block(&self, number: u64) -> Result<Option<BlockHeader>, TransportError> {
        self.enter()?;
        Ok(lock(&self.blocks).get(&number).copied())
    }

    async fn eth_call(&self, to: Address, data: Bytes) -> Result<Bytes, TransportError> {
        self.enter()?;
        match lock(&self.calls).get(&(to, data)) {
            Some(scripted) => scripted.clone(),
            // Calling an account without a matching function returns nothing.
            None => Ok(Bytes::new()),
        }
    }

    async fn get_storage_at(&self, address: Address, slot: B256) -> Result<B256, TransportError> {
        self.enter()?;
        Ok(lock(&self.storage)
            .get(&(address, slot))
            .copied()
            .unwrap_or_default())
    }

    async fn get_code(&self, address: Address) -> Result<Bytes, TransportError> {
        self.enter()?;
        Ok(lock(&self.code).get(&address).cloned().unwrap_or_default())
    }
}
