//! Chain status resolution for a single request.
//!
//! One call reads the chain once and returns the next lifecycle; there is
//! no polling loop and no retry. Terminal lifecycles are returned as they
//! are without touching the chain.

use chainbroker_abi::decode_logs;
use chainbroker_core::lifecycle::same_address;
use chainbroker_core::{
    BrokerError, EventDescriptor, ExpectedTransaction, RequestLifecycle, RequestState,
};
use chainbroker_rpc::{ChainRpc, TransactionInfo, TransactionReceipt};
use chrono::{DateTime, Utc};

/// Resolves lifecycles against a chain, decoding receipt logs with the
/// configured event descriptors.
#[derive(Debug, Clone, Default)]
pub struct StatusResolver {
    events: Vec<EventDescriptor>,
}

impl StatusResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events to decode from successful receipts.
    pub fn with_events(mut self, events: impl IntoIterator<Item = EventDescriptor>) -> Self {
        self.events.extend(events);
        self
    }

    pub fn events(&self) -> &[EventDescriptor] {
        &self.events
    }

    /// Computes the lifecycle the chain currently supports.
    ///
    /// Transport failures surface as `ResolutionTransientFailure` and the
    /// caller keeps its last known state.
    pub async fn resolve(
        &self,
        lifecycle: &RequestLifecycle,
        rpc: &dyn ChainRpc,
        min_confirmations: u64,
    ) -> Result<RequestLifecycle, BrokerError> {
        if lifecycle.is_terminal() {
            return Ok(lifecycle.clone());
        }
        let mut next = lifecycle.clone();
        let Some(tx_hash) = lifecycle.tx_hash else {
            next.state = RequestState::NotSubmitted;
            next.confirmations = None;
            next.block_timestamp = None;
            return Ok(next);
        };

        tracing::debug!(request_id = %lifecycle.request_id, tx_hash = %tx_hash, "resolving");
        let receipt = rpc
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(BrokerError::transient)?;
        let Some(receipt) = receipt else {
            next.state = RequestState::Pending;
            next.confirmations = None;
            return Ok(next);
        };

        let current = rpc.get_block_number().await.map_err(BrokerError::transient)?;
        let confirmations = confirmations(current, receipt.block_number);
        next.confirmations = Some(confirmations);

        if !receipt.success {
            next.block_timestamp = block_timestamp(rpc, receipt.block_number).await?;
            return Ok(finish(next, RequestState::Failed, "transaction reverted"));
        }
        if confirmations < min_confirmations {
            next.state = RequestState::Pending;
            return Ok(next);
        }

        if let Some(expected) = &lifecycle.expected {
            let tx = rpc
                .get_transaction(tx_hash)
                .await
                .map_err(BrokerError::transient)?;
            let Some(tx) = tx else {
                tracing::debug!(tx_hash = %tx_hash, "transaction body not visible yet");
                next.state = RequestState::Pending;
                return Ok(next);
            };
            if let Err(reason) = verify(lifecycle, expected, &receipt, &tx) {
                next.block_timestamp = block_timestamp(rpc, receipt.block_number).await?;
                return Ok(finish(next, RequestState::Failed, &reason));
            }
        }

        next.block_timestamp = block_timestamp(rpc, receipt.block_number).await?;
        next.contract_address = receipt.contract_address;
        next.events = decode_logs(&receipt.logs, &self.events);
        Ok(finish(next, RequestState::Success, "confirmed"))
    }
}

/// Blocks including and after the receipt's block; zero while the node's
/// head is behind it.
pub fn confirmations(current_block: u64, receipt_block: u64) -> u64 {
    current_block.saturating_add(1).saturating_sub(receipt_block)
}

fn finish(mut lifecycle: RequestLifecycle, state: RequestState, reason: &str) -> RequestLifecycle {
    tracing::info!(
        request_id = %lifecycle.request_id,
        state = ?state,
        confirmations = lifecycle.confirmations,
        reason,
        "request resolved"
    );
    lifecycle.state = state;
    lifecycle
}

async fn block_timestamp(
    rpc: &dyn ChainRpc,
    number: u64,
) -> Result<Option<DateTime<Utc>>, BrokerError> {
    let block = rpc.get_block(number).await.map_err(BrokerError::transient)?;
    Ok(block.and_then(|b| DateTime::from_timestamp(i64::try_from(b.timestamp).ok()?, 0)))
}

/// Checks the mined transaction against what the request asked for.
fn verify(
    lifecycle: &RequestLifecycle,
    expected: &ExpectedTransaction,
    receipt: &TransactionReceipt,
    tx: &TransactionInfo,
) -> Result<(), String> {
    if Some(tx.hash) != lifecycle.tx_hash {
        return Err(format!("node returned transaction {}", tx.hash));
    }
    if let Some(caller) = &lifecycle.caller {
        if !same_address(caller, &tx.from.to_string()) {
            return Err(format!("sent by {} instead of {caller}", tx.from));
        }
    }
    if expected.deployment {
        if tx.to.is_some() || receipt.contract_address.is_none() {
            return Err("expected a contract deployment".into());
        }
    } else if let Some(to) = expected.to {
        if tx.to != Some(to) {
            return Err(format!("sent to {:?} instead of {to}", tx.to));
        }
    }
    if let Some(data) = &expected.data {
        if &tx.input != data {
            return Err("call data differs".into());
        }
    }
    if let Some(value) = expected.value {
        if tx.value != value {
            return Err(format!("value {} instead of {value}", tx.value));
        }
    }
    Ok(())
}
