//! Error types shared across ChainBroker crates.

use thiserror::Error;

/// Errors from encoding, decoding and descriptor construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    #[error("Encoding failed: {reason}")]
    Encoding { reason: String },

    #[error("Decoding failed: {reason}")]
    Decoding { reason: String },

    #[error("No function matches selector 0x{selector}")]
    NoMatchingFunction { selector: String },

    #[error("Invalid ABI type '{ty}'")]
    InvalidType { ty: String },

    #[error("Invalid descriptor: {reason}")]
    InvalidDescriptor { reason: String },

    #[error("Duplicate selector 0x{selector} for '{signature}'")]
    DuplicateSelector { selector: String, signature: String },
}

impl AbiError {
    pub fn encoding(reason: impl Into<String>) -> Self {
        AbiError::Encoding {
            reason: reason.into(),
        }
    }

    pub fn decoding(reason: impl Into<String>) -> Self {
        AbiError::Decoding {
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by the lifecycle, matching and import operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    #[error(transparent)]
    Abi(#[from] AbiError),

    #[error("Request {request_id} already has a transaction attached")]
    TxAlreadyAttached { request_id: String },

    #[error("Interface '{interface_id}' is not implemented; missing {missing:?}")]
    IncompatibleInterface {
        interface_id: String,
        missing: Vec<String>,
    },

    #[error("Chain query failed, state unchanged: {reason}")]
    ResolutionTransientFailure { reason: String },

    #[error("No contract code at {address}")]
    ContractNotDeployed { address: String },

    #[error("Deployed binary does not match descriptor '{descriptor_id}'")]
    BinaryMismatch { descriptor_id: String },

    #[error("Unsupported chain id {chain_id}")]
    UnsupportedChain { chain_id: u64 },

    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} '{id}' already exists")]
    AlreadyExists { kind: &'static str, id: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },
}

impl BrokerError {
    pub fn transient(reason: impl ToString) -> Self {
        BrokerError::ResolutionTransientFailure {
            reason: reason.to_string(),
        }
    }

    /// Only transient chain failures are worth retrying; every other error
    /// is a property of the input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BrokerError::ResolutionTransientFailure { .. })
    }
}
