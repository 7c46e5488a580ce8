//! Importing contracts that were deployed outside the broker.
//!
//! Bytecode is scanned for `PUSH4` selector candidates and `PUSH32` topic
//! candidates. Candidates that hash-match a signature from the interface
//! catalog become verified entries. Unknown selectors stay as provisional
//! functions, so calls to them decode by word splitting only.

use chainbroker_abi::{decode_constructor_args, ConstructorArguments};
use chainbroker_core::signature::{selector, topic};
use chainbroker_core::{
    Address, BrokerError, ContractDescriptor, EventDescriptor, FunctionDescriptor, Selector, B256,
};
use chainbroker_rpc::ChainRpc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::{ContractCatalog, InterfaceCatalog};
use crate::interfaces::attach_satisfied;
use crate::proxy::{detect_proxy, ProxyInfo};

const PUSH1: u8 = 0x60;
const PUSH4: u8 = 0x63;
const PUSH32: u8 = 0x7f;

/// Selector and topic candidates found in runtime bytecode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedCode {
    pub selectors: BTreeSet<Selector>,
    pub topics: BTreeSet<B256>,
}

impl ObservedCode {
    pub fn scan(bytecode: &[u8]) -> Self {
        let mut observed = Self::default();
        let mut pc = 0;
        while pc < bytecode.len() {
            let op = bytecode[pc];
            pc += 1;
            if !(PUSH1..=PUSH32).contains(&op) {
                continue;
            }
            let width = usize::from(op - PUSH1) + 1;
            let Some(data) = bytecode.get(pc..pc + width) else {
                break;
            };
            match op {
                PUSH4 => {
                    observed.selectors.insert([data[0], data[1], data[2], data[3]]);
                }
                PUSH32 => {
                    observed.topics.insert(B256::from_slice(data));
                }
                _ => {}
            }
            pc += width;
        }
        observed
    }

    pub fn merge(&mut self, other: ObservedCode) {
        self.selectors.extend(other.selectors);
        self.topics.extend(other.topics);
    }
}

pub fn imported_id(address: Address, chain_id: u64) -> String {
    format!("imported-{}-{chain_id}", address.to_string().to_lowercase())
}

/// Builds a provisional descriptor from observed code and the catalog's
/// known signatures, then declares every interface it satisfies.
pub fn synthesize_descriptor(
    address: Address,
    chain_id: u64,
    observed: &ObservedCode,
    catalog: &dyn InterfaceCatalog,
) -> Result<ContractDescriptor, BrokerError> {
    let mut known_functions: BTreeMap<Selector, String> = BTreeMap::new();
    let mut known_events: BTreeMap<B256, String> = BTreeMap::new();
    for manifest in catalog.list_interfaces() {
        for sig in &manifest.functions {
            known_functions.entry(selector(sig)).or_insert_with(|| sig.clone());
        }
        for sig in &manifest.events {
            known_events.entry(topic(sig)).or_insert_with(|| sig.clone());
        }
    }

    let mut descriptor = ContractDescriptor::new(
        imported_id(address, chain_id),
        format!("Imported {address}"),
    );
    descriptor.provisional = true;

    let mut verified = 0usize;
    for sel in &observed.selectors {
        let function = match known_functions.get(sel) {
            Some(sig) => {
                verified += 1;
                FunctionDescriptor::from_signature(sig)?
            }
            None => FunctionDescriptor::provisional(*sel),
        };
        descriptor.add_function(function)?;
    }
    for t in &observed.topics {
        if let Some(sig) = known_events.get(t) {
            descriptor.add_event(EventDescriptor::from_signature(sig)?);
        }
    }

    let interfaces = attach_satisfied(&mut descriptor, catalog);
    tracing::info!(
        contract = %descriptor.id,
        selectors = observed.selectors.len(),
        verified,
        events = descriptor.events.len(),
        interfaces = ?interfaces,
        "descriptor synthesized"
    );
    Ok(descriptor)
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportedContract {
    pub descriptor: ContractDescriptor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyInfo>,
}

/// A deployment adopted under an existing descriptor.
#[derive(Debug, Clone, Serialize)]
pub struct AdoptedDeployment {
    pub descriptor_id: String,
    pub contract_address: Address,
    pub arguments: ConstructorArguments,
}

pub struct ContractImporter<'a> {
    contracts: &'a dyn ContractCatalog,
    interfaces: &'a dyn InterfaceCatalog,
}

impl<'a> ContractImporter<'a> {
    pub fn new(contracts: &'a dyn ContractCatalog, interfaces: &'a dyn InterfaceCatalog) -> Self {
        Self {
            contracts,
            interfaces,
        }
    }

    /// Reads the deployed code (following a proxy to its implementation),
    /// synthesizes a descriptor and stores it in the contract catalog.
    pub async fn import(
        &self,
        rpc: &dyn ChainRpc,
        address: Address,
        chain_id: u64,
    ) -> Result<ImportedContract, BrokerError> {
        let code = rpc.get_code(address).await.map_err(BrokerError::transient)?;
        if code.is_empty() {
            return Err(BrokerError::ContractNotDeployed {
                address: address.to_string(),
            });
        }
        let mut observed = ObservedCode::scan(&code);

        let proxy = detect_proxy(rpc, address).await?;
        if let Some(info) = &proxy {
            let implementation_code = rpc
                .get_code(info.implementation)
                .await
                .map_err(BrokerError::transient)?;
            observed.merge(ObservedCode::scan(&implementation_code));
        }

        let descriptor = synthesize_descriptor(address, chain_id, &observed, self.interfaces)?;
        self.contracts.put_contract(descriptor.clone())?;
        Ok(ImportedContract { descriptor, proxy })
    }

    /// Adopts the contract created by `tx_hash` under the stored descriptor
    /// `descriptor_id`.
    pub async fn adopt_deployment(
        &self,
        rpc: &dyn ChainRpc,
        tx_hash: B256,
        descriptor_id: &str,
    ) -> Result<AdoptedDeployment, BrokerError> {
        let descriptor = self
            .contracts
            .get_contract(descriptor_id)
            .ok_or_else(|| BrokerError::NotFound {
                kind: "contract",
                id: descriptor_id.to_string(),
            })?;
        let receipt = rpc
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(BrokerError::transient)?;
        let tx = rpc
            .get_transaction(tx_hash)
            .await
            .map_err(BrokerError::transient)?;
        let (Some(receipt), Some(tx)) = (receipt, tx) else {
            return Err(BrokerError::NotFound {
                kind: "transaction",
                id: tx_hash.to_string(),
            });
        };
        let contract_address = match (tx.to, receipt.contract_address) {
            (None, Some(created)) if receipt.success => created,
            _ => {
                return Err(BrokerError::ContractNotDeployed {
                    address: format!("(transaction {tx_hash})"),
                })
            }
        };
        let arguments = match_deployment(&descriptor, &tx.input)?;
        Ok(AdoptedDeployment {
            descriptor_id: descriptor.id,
            contract_address,
            arguments,
        })
    }
}

/// Checks that `creation_input` deploys the descriptor's code and decodes
/// the constructor arguments appended to it.
pub fn match_deployment(
    descriptor: &ContractDescriptor,
    creation_input: &[u8],
) -> Result<ConstructorArguments, BrokerError> {
    let mismatch = || BrokerError::BinaryMismatch {
        descriptor_id: descriptor.id.clone(),
    };
    let template: &[u8] = descriptor.code_template.as_ref().ok_or_else(mismatch)?;
    let args = creation_input.strip_prefix(template).ok_or_else(mismatch)?;
    Ok(decode_constructor_args(descriptor, args)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainbroker_core::{ConstructorDescriptor, Param, TypeDescriptor};

    #[test]
    fn scan_skips_push_data() {
        // PUSH4 a9059cbb, PUSH2 0x63ff (looks like PUSH4 but is data), STOP,
        // truncated PUSH32
        let code = hex_code("63a9059cbb6163ff007f0102");
        let observed = ObservedCode::scan(&code);
        assert_eq!(
            observed.selectors.into_iter().collect::<Vec<_>>(),
            [[0xa9, 0x05, 0x9c, 0xbb]]
        );
        assert!(observed.topics.is_empty());
    }

    #[test]
    fn scan_collects_topics() {
        let mut code = vec![PUSH32];
        code.extend_from_slice(B256::repeat_byte(0x11).as_slice());
        code.push(0x00);
        let observed = ObservedCode::scan(&code);
        assert!(observed.topics.contains(&B256::repeat_byte(0x11)));
    }

    fn hex_code(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    #[test]
    fn deployment_must_start_with_template() {
        let mut descriptor = ContractDescriptor::new("token", "Token");
        descriptor.code_template = Some(vec![0x60, 0x80, 0x60, 0x40].into());
        descriptor.constructors.push(ConstructorDescriptor {
            inputs: vec![Param::new("supply", TypeDescriptor::uint(256))],
        });

        let mut input = vec![0x60, 0x80, 0x60, 0x40];
        input.extend_from_slice(&[0u8; 31]);
        input.push(5);
        let ConstructorArguments::Verified { arguments } =
            match_deployment(&descriptor, &input).unwrap()
        else {
            panic!("expected verified constructor arguments");
        };
        assert_eq!(arguments[0].0, "supply");
        assert_eq!(arguments[0].1.to_string(), "5");

        let err = match_deployment(&descriptor, &[0x60, 0x00]).unwrap_err();
        assert!(matches!(err, BrokerError::BinaryMismatch { .. }));

        descriptor.code_template = None;
        assert!(match_deployment(&descriptor, &input).is_err());
    }
}
