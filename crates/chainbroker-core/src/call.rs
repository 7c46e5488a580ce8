//! Results of decoding call data.
//!
//! A verified decode and a provisional (word-split) decode are separate
//! types so callers cannot mistake a guess for a typed result.

use crate::signature::{self, Selector};
use crate::types::ParameterValue;
use alloy_primitives::{Bytes, B256};
use serde::{Deserialize, Serialize};

/// Call data decoded against a known function descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedCall {
    pub function_name: String,
    pub signature: String,
    pub selector: Selector,
    /// Decoded inputs in declaration order
    pub arguments: Vec<(String, ParameterValue)>,
}

impl DecodedCall {
    pub fn selector_hex(&self) -> String {
        signature::selector_hex(&self.selector)
    }

    pub fn argument(&self, name: &str) -> Option<&ParameterValue> {
        self.arguments
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

/// One opaque 32-byte word of a provisional decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionalArgument {
    pub name: String,
    pub word: B256,
}

/// Best-effort split of unrecognised call data into `bytes32` words.
/// Carries no guarantee that the words line up with real arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionalCall {
    /// `None` for constructor arguments
    pub selector: Option<Selector>,
    pub arguments: Vec<ProvisionalArgument>,
    /// Bytes left over after the last whole word
    #[serde(default)]
    pub trailing: Bytes,
}

impl ProvisionalCall {
    /// The words as `bytes32` values, in order.
    pub fn values(&self) -> Vec<(String, ParameterValue)> {
        self.arguments
            .iter()
            .map(|a| (a.name.clone(), ParameterValue::fixed_bytes(a.word.to_vec())))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decoding", rename_all = "lowercase")]
pub enum CallDecoding {
    Verified(DecodedCall),
    Provisional(ProvisionalCall),
}

impl CallDecoding {
    pub fn is_verified(&self) -> bool {
        matches!(self, CallDecoding::Verified(_))
    }

    pub fn verified(&self) -> Option<&DecodedCall> {
        match self {
            CallDecoding::Verified(call) => Some(call),
            CallDecoding::Provisional(_) => None,
        }
    }
}
