//! Request bookkeeping on top of a store and the status resolver.

use chainbroker_core::{
    BrokerError, ExpectedTransaction, RequestId, RequestLifecycle, B256,
};
use chainbroker_rpc::ChainRpc;
use std::sync::Arc;

use crate::status::StatusResolver;
use crate::store::RequestStore;

pub struct RequestTracker {
    store: Arc<dyn RequestStore>,
    resolver: StatusResolver,
}

impl RequestTracker {
    pub fn new(store: Arc<dyn RequestStore>, resolver: StatusResolver) -> Self {
        Self { store, resolver }
    }

    pub fn resolver(&self) -> &StatusResolver {
        &self.resolver
    }

    /// Registers a request that has not been submitted yet.
    pub async fn create(
        &self,
        chain_id: u64,
        expected: Option<ExpectedTransaction>,
    ) -> Result<RequestLifecycle, BrokerError> {
        let mut lifecycle = RequestLifecycle::new(RequestId::generate(), chain_id);
        lifecycle.expected = expected;
        self.store.insert(lifecycle.clone()).await?;
        tracing::info!(request_id = %lifecycle.request_id, chain_id, "request created");
        Ok(lifecycle)
    }

    /// Binds the submitted transaction. Only the first attach succeeds.
    pub async fn attach(
        &self,
        request_id: &RequestId,
        tx_hash: B256,
        caller: &str,
    ) -> Result<RequestLifecycle, BrokerError> {
        let lifecycle = self.store.attach_tx(request_id, tx_hash, caller).await?;
        tracing::info!(request_id = %request_id, tx_hash = %tx_hash, caller, "transaction attached");
        Ok(lifecycle)
    }

    /// Resolves against the chain and persists the result.
    ///
    /// A transient chain failure is logged and the last stored state is
    /// returned unchanged.
    pub async fn status(
        &self,
        request_id: &RequestId,
        rpc: &dyn ChainRpc,
        min_confirmations: u64,
    ) -> Result<RequestLifecycle, BrokerError> {
        let stored = self
            .store
            .get(request_id)
            .await?
            .ok_or_else(|| BrokerError::NotFound {
                kind: "request",
                id: request_id.to_string(),
            })?;
        match self.resolver.resolve(&stored, rpc, min_confirmations).await {
            Ok(next) if next == stored => Ok(next),
            Ok(next) => self.store.save_resolution(next).await,
            Err(e) if e.is_retryable() => {
                tracing::warn!(request_id = %request_id, error = %e, "status unavailable, keeping last state");
                Ok(stored)
            }
            Err(e) => Err(e),
        }
    }
}
