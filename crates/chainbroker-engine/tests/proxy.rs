//! Proxy detection against scripted chain state.

use chainbroker_core::{Address, BrokerError, Bytes, B256};
use chainbroker_engine::proxy::{
    EIP1167_BYTECODE_PREFIX, EIP1167_BYTECODE_SUFFIX, EIP1967_BEACON_SLOT, EIP1967_IMPL_SLOT,
    IMPLEMENTATION_SELECTOR, ZEPPELIN_IMPL_SLOT,
};
use chainbroker_engine::{detect_proxy, MockChain, ProxyKind};
use chainbroker_rpc::TransportError;

fn proxy() -> Address {
    Address::repeat_byte(0x10)
}

fn implementation() -> Address {
    Address::repeat_byte(0x20)
}

fn chain_with_code() -> MockChain {
    let chain = MockChain::new();
    chain.set_code(proxy(), vec![0x60, 0x80, 0x60, 0x40, 0x52]);
    chain
}

fn accessor_call() -> Bytes {
    Bytes::from(IMPLEMENTATION_SELECTOR.to_vec())
}

#[tokio::test]
async fn no_code_is_not_deployed() {
    let err = detect_proxy(&MockChain::new(), proxy()).await.unwrap_err();
    assert!(matches!(err, BrokerError::ContractNotDeployed { .. }));
}

#[tokio::test]
async fn plain_contract_is_not_a_proxy() {
    assert!(detect_proxy(&chain_with_code(), proxy()).await.unwrap().is_none());
}

#[tokio::test]
async fn eip1967_slot() {
    let chain = chain_with_code();
    chain.set_storage(proxy(), EIP1967_IMPL_SLOT, implementation().into_word());
    let info = detect_proxy(&chain, proxy()).await.unwrap().unwrap();
    assert_eq!(info.kind, ProxyKind::Eip1967Logic);
    assert_eq!(info.implementation, implementation());
    assert_eq!(info.slot, Some(EIP1967_IMPL_SLOT));
}

#[tokio::test]
async fn zeppelin_legacy_slot() {
    let chain = chain_with_code();
    chain.set_storage(proxy(), ZEPPELIN_IMPL_SLOT, implementation().into_word());
    let info = detect_proxy(&chain, proxy()).await.unwrap().unwrap();
    assert_eq!(info.kind, ProxyKind::ZeppelinLegacy);
}

#[tokio::test]
async fn beacon_is_asked_for_implementation() {
    let beacon = Address::repeat_byte(0x30);
    let chain = chain_with_code();
    chain.set_storage(proxy(), EIP1967_BEACON_SLOT, beacon.into_word());
    chain.set_call_result(beacon, accessor_call(), implementation().into_word().to_vec());
    let info = detect_proxy(&chain, proxy()).await.unwrap().unwrap();
    assert_eq!(info.kind, ProxyKind::Eip1967Beacon);
    assert_eq!(info.beacon, Some(beacon));
    assert_eq!(info.implementation, implementation());
}

#[tokio::test]
async fn accessor_fallback() {
    let chain = chain_with_code();
    chain.set_call_result(proxy(), accessor_call(), implementation().into_word().to_vec());
    let info = detect_proxy(&chain, proxy()).await.unwrap().unwrap();
    assert_eq!(info.kind, ProxyKind::Accessor);
    assert_eq!(info.implementation, implementation());
}

#[tokio::test]
async fn reverting_accessor_means_not_a_proxy() {
    let chain = chain_with_code();
    chain.set_call_revert(proxy(), accessor_call(), "no such function");
    assert!(detect_proxy(&chain, proxy()).await.unwrap().is_none());

    // A zero answer is no answer.
    chain.set_call_result(proxy(), accessor_call(), B256::ZERO.to_vec());
    assert!(detect_proxy(&chain, proxy()).await.unwrap().is_none());
}

#[tokio::test]
async fn minimal_clone_from_bytecode() {
    let chain = MockChain::new();
    let mut code = EIP1167_BYTECODE_PREFIX.to_vec();
    code.extend_from_slice(implementation().as_slice());
    code.extend_from_slice(EIP1167_BYTECODE_SUFFIX);
    chain.set_code(proxy(), code);

    let before = chain.query_count();
    let info = detect_proxy(&chain, proxy()).await.unwrap().unwrap();
    assert_eq!(info.kind, ProxyKind::Eip1167Clone);
    assert_eq!(info.implementation, implementation());
    assert_eq!(chain.query_count() - before, 1);
}

#[tokio::test]
async fn transport_failure_is_transient() {
    let chain = chain_with_code();
    chain.set_offline(true);
    let err = detect_proxy(&chain, proxy()).await.unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn node_error_from_accessor_is_transient() {
    let chain = chain_with_code();
    chain.set_call_error(
        proxy(),
        accessor_call(),
        TransportError::Node {
            code: -32000,
            message: "missing trie node".into(),
        },
    );
    let err = detect_proxy(&chain, proxy()).await.unwrap_err();
    assert!(matches!(err, BrokerError::ResolutionTransientFailure { .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn unreachable_beacon_is_transient() {
    let beacon = Address::repeat_byte(0x30);
    let chain = chain_with_code();
    chain.set_storage(proxy(), EIP1967_BEACON_SLOT, beacon.into_word());
    chain.set_call_error(
        beacon,
        accessor_call(),
        TransportError::RateLimited {
            url: "http://node".into(),
        },
    );
    let err = detect_proxy(&chain, proxy()).await.unwrap_err();
    assert!(matches!(err, BrokerError::ResolutionTransientFailure { .. }));
}
