//! Proxy contract detection.
//!
//! | Pattern | Evidence |
//! |---------|----------|
//! | EIP-1167 minimal clone | runtime bytecode |
//! | EIP-1967 logic proxy | implementation storage slot |
//! | ZeppelinOS legacy proxy | `org.zeppelinos.proxy.implementation` slot |
//! | EIP-1967 beacon proxy | beacon slot, then `implementation()` on the beacon |
//! | accessor proxy | `implementation()` on the contract itself |
//!
//! Checks run in that order and the first hit wins.

use alloy_primitives::{b256, Address, Bytes, B256};
use chainbroker_core::BrokerError;
use chainbroker_rpc::ChainRpc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxyKind {
    Eip1167Clone,
    Eip1967Logic,
    ZeppelinLegacy,
    Eip1967Beacon,
    Accessor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyInfo {
    pub proxy_address: Address,
    pub kind: ProxyKind,
    pub implementation: Address,
    /// Storage slot the evidence came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<B256>,
    /// Set for beacon proxies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beacon: Option<Address>,
}

/// `keccak256("eip1967.proxy.implementation") - 1`
pub const EIP1967_IMPL_SLOT: B256 =
    b256!("360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc");

/// `keccak256("eip1967.proxy.beacon") - 1`
pub const EIP1967_BEACON_SLOT: B256 =
    b256!("a3f0ad74e5423aebfd80d3ef4346578335a9a72aeaee59ff6cb3582b35133d50");

/// `keccak256("org.zeppelinos.proxy.implementation")`
pub const ZEPPELIN_IMPL_SLOT: B256 =
    b256!("7050c9e0f4ca769c69bd3a8ef740bc37934f8e2c036e5a723fd8ee048ed3f8c3");

/// Selector of `implementation()`
pub const IMPLEMENTATION_SELECTOR: [u8; 4] = [0x5c, 0x60, 0xda, 0x1b];

pub const EIP1167_BYTECODE_PREFIX: &[u8] = &[0x36, 0x3d, 0x3d, 0x37, 0x3d, 0x3d, 0x3d, 0x36, 0x3d, 0x73];

pub const EIP1167_BYTECODE_SUFFIX: &[u8] = &[
    0x5a, 0xf4, 0x3d, 0x82, 0x80, 0x3e, 0x90, 0x3d, 0x91, 0x60, 0x2b, 0x57, 0xfd, 0x5b, 0xf3,
];

/// Implementation address embedded in EIP-1167 clone bytecode.
///
/// Layout: 10 prefix bytes, 20 address bytes, 15 suffix bytes.
pub fn detect_eip1167_clone(bytecode: &[u8]) -> Option<Address> {
    if bytecode.len() != 45
        || &bytecode[..10] != EIP1167_BYTECODE_PREFIX
        || &bytecode[30..] != EIP1167_BYTECODE_SUFFIX
    {
        return None;
    }
    Some(Address::from_slice(&bytecode[10..30]))
}

/// A left-padded, non-zero address stored in a 32-byte word.
pub fn storage_to_address(word: &B256) -> Option<Address> {
    if word[..12].iter().any(|b| *b != 0) {
        return None;
    }
    let address = Address::from_slice(&word[12..]);
    (!address.is_zero()).then_some(address)
}

/// Finds the implementation behind `address`, or `None` when it is not a
/// proxy. Empty code is `ContractNotDeployed`.
pub async fn detect_proxy(
    rpc: &dyn ChainRpc,
    address: Address,
) -> Result<Option<ProxyInfo>, BrokerError> {
    let code = rpc.get_code(address).await.map_err(BrokerError::transient)?;
    if code.is_empty() {
        return Err(BrokerError::ContractNotDeployed {
            address: address.to_string(),
        });
    }

    let found = |kind: ProxyKind,
                 implementation: Address,
                 slot: Option<B256>,
                 beacon: Option<Address>|
     -> Result<Option<ProxyInfo>, BrokerError> {
        tracing::debug!(proxy = %address, implementation = %implementation, ?kind, "proxy detected");
        Ok(Some(ProxyInfo {
            proxy_address: address,
            kind,
            implementation,
            slot,
            beacon,
        }))
    };

    if let Some(implementation) = detect_eip1167_clone(&code) {
        return found(ProxyKind::Eip1167Clone, implementation, None, None);
    }

    for (kind, slot) in [
        (ProxyKind::Eip1967Logic, EIP1967_IMPL_SLOT),
        (ProxyKind::ZeppelinLegacy, ZEPPELIN_IMPL_SLOT),
    ] {
        let word = rpc
            .get_storage_at(address, slot)
            .await
            .map_err(BrokerError::transient)?;
        if let Some(implementation) = storage_to_address(&word) {
            return found(kind, implementation, Some(slot), None);
        }
    }

    let beacon_word = rpc
        .get_storage_at(address, EIP1967_BEACON_SLOT)
        .await
        .map_err(BrokerError::transient)?;
    if let Some(beacon) = storage_to_address(&beacon_word) {
        if let Some(implementation) = call_implementation(rpc, beacon).await? {
            return found(
                ProxyKind::Eip1967Beacon,
                implementation,
                Some(EIP1967_BEACON_SLOT),
                Some(beacon),
            );
        }
    }

    match call_implementation(rpc, address).await? {
        Some(implementation) if implementation != address => {
            found(ProxyKind::Accessor, implementation, None, None)
        }
        _ => Ok(None),
    }
}

/// Asks `target` for `implementation()`. A revert or an unusable answer
/// means there is none; any other failure is transient.
async fn call_implementation(
    rpc: &dyn ChainRpc,
    target: Address,
) -> Result<Option<Address>, BrokerError> {
    let data = Bytes::from(IMPLEMENTATION_SELECTOR.to_vec());
    match rpc.eth_call(target, data).await {
        Ok(out) if out.len() >= 32 => Ok(storage_to_address(&B256::from_slice(&out[..32]))),
        Ok(_) => Ok(None),
        Err(e) if e.is_revert() => {
            tracing::debug!(target = %target, error = %e, "implementation() not available");
            Ok(None)
        }
        Err(e) => Err(BrokerError::transient(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clone_bytecode(implementation: Address) -> Vec<u8> {
        let mut code = EIP1167_BYTECODE_PREFIX.to_vec();
        code.extend_from_slice(implementation.as_slice());
        code.extend_from_slice(EIP1167_BYTECODE_SUFFIX);
        code
    }

    #[test]
    fn eip1167_clone_detected() {
        let implementation = Address::repeat_byte(0xab);
        assert_eq!(
            detect_eip1167_clone(&clone_bytecode(implementation)),
            Some(implementation)
        );
        assert!(detect_eip1167_clone(&[0u8; 44]).is_none());
        let mut broken = clone_bytecode(implementation);
        broken[44] = 0;
        assert!(detect_eip1167_clone(&broken).is_none());
    }

    #[test]
    fn storage_word_to_address() {
        let a = Address::repeat_byte(0xd8);
        assert_eq!(storage_to_address(&a.into_word()), Some(a));
        assert!(storage_to_address(&B256::ZERO).is_none());
        assert!(storage_to_address(&B256::repeat_byte(1)).is_none());
    }

    #[test]
    fn implementation_selector_matches_signature() {
        assert_eq!(
            chainbroker_core::signature::selector("implementation()"),
            IMPLEMENTATION_SELECTOR
        );
    }
}
