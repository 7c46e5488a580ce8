//! # chainbroker-engine
//!
//! The stateful side of ChainBroker: resolving request lifecycles against a
//! chain, the request store with its exclusive attach, contract and
//! interface catalogs, proxy detection, interface matching and importing
//! contracts deployed elsewhere.
//!
//! Nothing here owns a thread or a polling loop; every operation is one
//! awaited call driven by the caller.

pub mod catalog;
pub mod import;
pub mod interfaces;
pub mod mock;
pub mod proxy;
pub mod status;
pub mod store;
pub mod tracker;

pub use catalog::{ContractCatalog, InterfaceCatalog, MemoryCatalog};
pub use import::{
    match_deployment, synthesize_descriptor, AdoptedDeployment, ContractImporter,
    ImportedContract, ObservedCode,
};
pub use interfaces::{
    add_interfaces, attach_satisfied, remove_interfaces, set_interfaces, suggest_interfaces,
    InterfaceMatch, InterfaceSuggestions,
};
pub use mock::MockChain;
pub use proxy::{detect_proxy, ProxyInfo, ProxyKind};
pub use status::StatusResolver;
pub use store::{MemoryRequestStore, RequestStore};
pub use tracker::RequestTracker;
