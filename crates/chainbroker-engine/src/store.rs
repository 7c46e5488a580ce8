//! Request persistence boundary.
//!
//! `attach_tx` is the compare-and-set that makes attaching a transaction
//! exclusive per request: of N concurrent attempts exactly one wins.
//! `save_resolution` never moves a stored request backwards.

use async_trait::async_trait;
use chainbroker_core::{BrokerError, RequestId, RequestLifecycle, B256};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Stores a new request. Fails with `AlreadyExists` for a known id.
    async fn insert(&self, lifecycle: RequestLifecycle) -> Result<(), BrokerError>;

    async fn get(&self, request_id: &RequestId) -> Result<Option<RequestLifecycle>, BrokerError>;

    /// Sets the tx hash and caller if, and only if, none is set yet.
    async fn attach_tx(
        &self,
        request_id: &RequestId,
        tx_hash: B256,
        caller: &str,
    ) -> Result<RequestLifecycle, BrokerError>;

    /// Persists a resolved lifecycle and returns what is stored afterwards.
    ///
    /// The write is dropped when the stored request is already terminal or
    /// carries a different transaction.
    async fn save_resolution(
        &self,
        lifecycle: RequestLifecycle,
    ) -> Result<RequestLifecycle, BrokerError>;
}

/// Process-local store.
#[derive(Default)]
pub struct MemoryRequestStore {
    data: Mutex<HashMap<RequestId, RequestLifecycle>>,
}

impl MemoryRequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<RequestId, RequestLifecycle>> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn not_found(request_id: &RequestId) -> BrokerError {
    BrokerError::NotFound {
        kind: "request",
        id: request_id.to_string(),
    }
}

#[async_trait]
impl RequestStore for MemoryRequestStore {
    async fn insert(&self, lifecycle: RequestLifecycle) -> Result<(), BrokerError> {
        let mut data = self.lock();
        if data.contains_key(&lifecycle.request_id) {
            return Err(BrokerError::AlreadyExists {
                kind: "request",
                id: lifecycle.request_id.to_string(),
            });
        }
        data.insert(lifecycle.request_id.clone(), lifecycle);
        Ok(())
    }

    async fn get(&self, request_id: &RequestId) -> Result<Option<RequestLifecycle>, BrokerError> {
        Ok(self.lock().get(request_id).cloned())
    }

    async fn attach_tx(
        &self,
        request_id: &RequestId,
        tx_hash: B256,
        caller: &str,
    ) -> Result<RequestLifecycle, BrokerError> {
        let mut data = self.lock();
        let stored = data.get_mut(request_id).ok_or_else(|| not_found(request_id))?;
        stored.attach(tx_hash, caller)?;
        Ok(stored.clone())
    }

    async fn save_resolution(
        &self,
        lifecycle: RequestLifecycle,
    ) -> Result<RequestLifecycle, BrokerError> {
        let mut data = self.lock();
        let stored = data
            .get_mut(&lifecycle.request_id)
            .ok_or_else(|| not_found(&lifecycle.request_id))?;
        if stored.is_terminal() || stored.tx_hash != lifecycle.tx_hash {
            tracing::debug!(
                request_id = %lifecycle.request_id,
                stored = ?stored.state,
                "resolution not persisted"
            );
            return Ok(stored.clone());
        }
        *stored = lifecycle;
        Ok(stored.clone())
    }
}
