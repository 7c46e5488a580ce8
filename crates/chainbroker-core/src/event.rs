//! Raw logs and their decoded form.

use crate::types::ParameterValue;
use alloy_primitives::{Address, Bytes, B256};
use serde::{Deserialize, Serialize};

/// A log entry exactly as a transaction receipt reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLog {
    pub address: Address,
    /// `topics[0]` is the event topic for non-anonymous events
    pub topics: Vec<B256>,
    pub data: Bytes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_index: Option<u64>,
}

impl RawLog {
    pub fn topic0(&self) -> Option<&B256> {
        self.topics.first()
    }
}

/// Whether an argument carries its value or only the hash of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ArgumentKind {
    Value,
    /// Indexed dynamic or composite argument; only its keccak hash is on-chain
    Hash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventArgument {
    pub name: String,
    pub kind: ArgumentKind,
    pub value: Option<ParameterValue>,
    pub hash: Option<B256>,
}

impl EventArgument {
    pub fn value(name: impl Into<String>, value: ParameterValue) -> Self {
        Self {
            name: name.into(),
            kind: ArgumentKind::Value,
            value: Some(value),
            hash: None,
        }
    }

    pub fn hash(name: impl Into<String>, hash: B256) -> Self {
        Self {
            name: name.into(),
            kind: ArgumentKind::Hash,
            value: None,
            hash: Some(hash),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedEvent {
    pub name: String,
    pub signature: String,
    /// Emitting contract
    pub address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_index: Option<u64>,
    /// Arguments in declaration order
    pub arguments: Vec<EventArgument>,
}

impl DecodedEvent {
    pub fn argument(&self, name: &str) -> Option<&EventArgument> {
        self.arguments.iter().find(|a| a.name == name)
    }
}
