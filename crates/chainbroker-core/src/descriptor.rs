//! Declarative contract descriptors and interface manifests.

use crate::error::AbiError;
use crate::signature::{self, Selector};
use crate::types::{Param, TypeDescriptor};
use alloy_primitives::{Bytes, B256};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// A callable function of a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    pub name: String,
    /// Canonical signature, e.g. `transfer(address,uint256)`
    pub signature: String,
    pub inputs: Vec<Param>,
    #[serde(default)]
    pub outputs: Vec<Param>,
    /// `view` / `pure` functions
    #[serde(default)]
    pub read_only: bool,
    pub selector: Selector,
    /// Observed on-chain but not matched to any known signature.
    /// Arguments of such functions can only be decoded word by word.
    #[serde(default)]
    pub provisional: bool,
}

impl FunctionDescriptor {
    pub fn new(
        name: impl Into<String>,
        inputs: Vec<Param>,
        outputs: Vec<Param>,
        read_only: bool,
    ) -> Self {
        let name = name.into();
        let signature = signature::canonical_signature(&name, inputs.iter().map(|p| &p.ty));
        let selector = signature::selector(&signature);
        Self {
            name,
            signature,
            inputs,
            outputs,
            read_only,
            selector,
            provisional: false,
        }
    }

    /// Builds a descriptor from a bare signature like `approve(address,uint256)`.
    pub fn from_signature(sig: &str) -> Result<Self, AbiError> {
        let (name, inputs) = signature::parse_signature(sig)?;
        Ok(Self::new(name, inputs, Vec::new(), false))
    }

    /// Placeholder for a selector seen in bytecode with no known signature.
    pub fn provisional(selector: Selector) -> Self {
        let hex = signature::selector_hex(&selector);
        Self {
            name: hex.clone(),
            signature: hex,
            inputs: Vec::new(),
            outputs: Vec::new(),
            read_only: false,
            selector,
            provisional: true,
        }
    }

    pub fn selector_hex(&self) -> String {
        signature::selector_hex(&self.selector)
    }

    pub fn input_types(&self) -> Vec<TypeDescriptor> {
        self.inputs.iter().map(|p| p.ty.clone()).collect()
    }
}

/// One parameter of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventParam {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeDescriptor,
    #[serde(default)]
    pub indexed: bool,
}

impl EventParam {
    pub fn new(name: impl Into<String>, ty: TypeDescriptor, indexed: bool) -> Self {
        Self {
            name: name.into(),
            ty,
            indexed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDescriptor {
    pub name: String,
    pub signature: String,
    pub params: Vec<EventParam>,
    /// keccak256 of the signature; appears as `topics[0]` of matching logs
    pub topic: B256,
}

impl EventDescriptor {
    pub fn new(name: impl Into<String>, params: Vec<EventParam>) -> Self {
        let name = name.into();
        let signature = signature::canonical_signature(&name, params.iter().map(|p| &p.ty));
        let topic = signature::topic(&signature);
        Self {
            name,
            signature,
            params,
            topic,
        }
    }

    /// Builds an event with unnamed, non-indexed params from a bare signature.
    pub fn from_signature(sig: &str) -> Result<Self, AbiError> {
        let (name, params) = signature::parse_signature(sig)?;
        let params = params
            .into_iter()
            .map(|p| EventParam::new(p.name, p.ty, false))
            .collect();
        Ok(Self::new(name, params))
    }

    pub fn indexed_count(&self) -> usize {
        self.params.iter().filter(|p| p.indexed).count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructorDescriptor {
    pub inputs: Vec<Param>,
}

/// Everything known about a contract: its callable surface, emitted events,
/// deployment template and the interfaces it has been declared to implement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractDescriptor {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Ids of interface manifests this contract implements
    #[serde(default)]
    pub implements: BTreeSet<String>,
    #[serde(default)]
    pub constructors: Vec<ConstructorDescriptor>,
    #[serde(default)]
    pub functions: Vec<FunctionDescriptor>,
    #[serde(default)]
    pub events: Vec<EventDescriptor>,
    /// Creation bytecode without constructor arguments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_template: Option<Bytes>,
    /// Synthesized from observed bytecode rather than declared
    #[serde(default)]
    pub provisional: bool,
}

impl ContractDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            tags: Vec::new(),
            implements: BTreeSet::new(),
            constructors: Vec::new(),
            functions: Vec::new(),
            events: Vec::new(),
            code_template: None,
            provisional: false,
        }
    }

    /// Adds a function, rejecting a selector already taken by another one.
    pub fn add_function(&mut self, function: FunctionDescriptor) -> Result<(), AbiError> {
        if self.function_by_selector(&function.selector).is_some() {
            return Err(AbiError::DuplicateSelector {
                selector: hex::encode(function.selector),
                signature: function.signature,
            });
        }
        self.functions.push(function);
        Ok(())
    }

    pub fn with_function(mut self, function: FunctionDescriptor) -> Result<Self, AbiError> {
        self.add_function(function)?;
        Ok(self)
    }

    /// Adds an event unless one with the same signature is already present.
    pub fn add_event(&mut self, event: EventDescriptor) {
        if !self.events.iter().any(|e| e.signature == event.signature) {
            self.events.push(event);
        }
    }

    pub fn with_event(mut self, event: EventDescriptor) -> Self {
        self.add_event(event);
        self
    }

    /// Checks invariants that deserialization cannot enforce.
    pub fn validate(&self) -> Result<(), AbiError> {
        let mut seen = HashSet::new();
        for f in &self.functions {
            if !seen.insert(f.selector) {
                return Err(AbiError::DuplicateSelector {
                    selector: hex::encode(f.selector),
                    signature: f.signature.clone(),
                });
            }
            if !f.provisional && signature::selector(&f.signature) != f.selector {
                return Err(AbiError::InvalidDescriptor {
                    reason: format!("selector of '{}' does not match its signature", f.signature),
                });
            }
        }
        Ok(())
    }

    pub fn function_by_selector(&self, selector: &Selector) -> Option<&FunctionDescriptor> {
        self.functions.iter().find(|f| &f.selector == selector)
    }

    pub fn function_by_name(&self, name: &str) -> Option<&FunctionDescriptor> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Signatures of all verified (non-provisional) functions.
    pub fn function_signatures(&self) -> BTreeSet<String> {
        self.functions
            .iter()
            .filter(|f| !f.provisional)
            .map(|f| f.signature.clone())
            .collect()
    }

    pub fn event_signatures(&self) -> BTreeSet<String> {
        self.events.iter().map(|e| e.signature.clone()).collect()
    }
}

/// A named capability: the function and event signatures a contract must
/// expose to implement it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceManifest {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub functions: BTreeSet<String>,
    #[serde(default)]
    pub events: BTreeSet<String>,
}

impl InterfaceManifest {
    pub fn new<F, E>(id: impl Into<String>, functions: F, events: E) -> Self
    where
        F: IntoIterator,
        F::Item: Into<String>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: None,
            tags: Vec::new(),
            functions: functions.into_iter().map(Into::into).collect(),
            events: events.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of signatures a contract has to expose.
    pub fn required_count(&self) -> usize {
        self.functions.len() + self.events.len()
    }

    /// Rewrites every signature into canonical form, so `f(uint)` and
    /// `f( uint256 )` both become `f(uint256)`.
    pub fn canonicalized(mut self) -> Result<Self, AbiError> {
        self.functions = canonical_set(&self.functions)?;
        self.events = canonical_set(&self.events)?;
        Ok(self)
    }
}

fn canonical_set(signatures: &BTreeSet<String>) -> Result<BTreeSet<String>, AbiError> {
    signatures
        .iter()
        .map(|sig| {
            let (name, params) = signature::parse_signature(sig)?;
            Ok(signature::canonical_signature(
                &name,
                params.iter().map(|p| &p.ty),
            ))
        })
        .collect()
}
