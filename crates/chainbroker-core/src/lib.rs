//! # chainbroker-core
//!
//! Shared model for the ChainBroker engine: ABI type descriptors and values,
//! contract descriptors, interface manifests, decoded calls and events, the
//! request lifecycle, and the error taxonomy every other crate reports in.

pub mod call;
pub mod descriptor;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod signature;
pub mod types;

pub use call::{CallDecoding, DecodedCall, ProvisionalArgument, ProvisionalCall};
pub use descriptor::{
    ConstructorDescriptor, ContractDescriptor, EventDescriptor, EventParam, FunctionDescriptor,
    InterfaceManifest,
};
pub use error::{AbiError, BrokerError};
pub use event::{ArgumentKind, DecodedEvent, EventArgument, RawLog};
pub use lifecycle::{ExpectedTransaction, RequestId, RequestLifecycle, RequestState, RequestStatus};
pub use signature::Selector;
pub use types::{Param, ParameterValue, ScalarKind, ScalarValue, TypeDescriptor};

pub use alloy_primitives::{Address, Bytes, B256, I256, U256};
