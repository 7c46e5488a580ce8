//! Request lifecycle state machine.
//!
//! ```text
//! NOT_SUBMITTED --attach--> PENDING --resolve(success)--> SUCCESS
//!                           PENDING --resolve(failure)--> FAILED
//!                           PENDING --resolve(no receipt)--> PENDING
//! ```
//!
//! SUCCESS and FAILED are terminal. Only the status resolver moves a
//! lifecycle out of PENDING; only `attach` moves it out of NOT_SUBMITTED.

use crate::error::BrokerError;
use crate::event::DecodedEvent;
use alloy_primitives::{Address, Bytes, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestState {
    NotSubmitted,
    Pending,
    Success,
    Failed,
}

impl RequestState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestState::Success | RequestState::Failed)
    }
}

/// What callers outside the engine see. A request without a transaction is
/// reported as pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Success,
    Failed,
}

/// The transaction a request is supposed to produce. When present, a
/// successful receipt only counts if the mined transaction agrees with it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedTransaction {
    /// Call target; `None` for deployments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    /// The transaction must create a contract
    #[serde(default)]
    pub deployment: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestLifecycle {
    pub request_id: RequestId,
    pub chain_id: u64,
    pub state: RequestState,
    /// Write-once; see [`RequestLifecycle::attach`]
    pub tx_hash: Option<B256>,
    /// Submitting account, kept as the caller supplied it
    pub caller: Option<String>,
    pub confirmations: Option<u64>,
    pub block_timestamp: Option<DateTime<Utc>>,
    /// Set when a deployment transaction created a contract
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<Address>,
    #[serde(default)]
    pub events: Vec<DecodedEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<ExpectedTransaction>,
}

impl RequestLifecycle {
    pub fn new(request_id: RequestId, chain_id: u64) -> Self {
        Self {
            request_id,
            chain_id,
            state: RequestState::NotSubmitted,
            tx_hash: None,
            caller: None,
            confirmations: None,
            block_timestamp: None,
            contract_address: None,
            events: Vec::new(),
            expected: None,
        }
    }

    pub fn with_expected(mut self, expected: ExpectedTransaction) -> Self {
        self.expected = Some(expected);
        self
    }

    /// Records the submitted transaction. Succeeds only once.
    pub fn attach(&mut self, tx_hash: B256, caller: impl Into<String>) -> Result<(), BrokerError> {
        if self.tx_hash.is_some() || self.state != RequestState::NotSubmitted {
            return Err(BrokerError::TxAlreadyAttached {
                request_id: self.request_id.to_string(),
            });
        }
        self.tx_hash = Some(tx_hash);
        self.caller = Some(caller.into());
        self.state = RequestState::Pending;
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn status(&self) -> RequestStatus {
        match self.state {
            RequestState::NotSubmitted | RequestState::Pending => RequestStatus::Pending,
            RequestState::Success => RequestStatus::Success,
            RequestState::Failed => RequestStatus::Failed,
        }
    }
}

/// Case-insensitive address comparison, tolerant of a missing `0x` prefix.
pub fn same_address(a: &str, b: &str) -> bool {
    let strip = |s: &str| {
        let s = s.trim();
        s.strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s)
            .to_string()
    };
    strip(a).eq_ignore_ascii_case(&strip(b))
}
