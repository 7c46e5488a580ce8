//! Interface matching and contract import.

use chainbroker_abi::{decode_call, encode_call, encode_params, match_function, ConstructorArguments};
use chainbroker_core::signature::selector;
use chainbroker_core::{
    Address, BrokerError, Bytes, ConstructorDescriptor, ContractDescriptor, FunctionDescriptor,
    InterfaceManifest, Param, ParameterValue, B256, U256,
};
use chainbroker_engine::proxy::EIP1967_IMPL_SLOT;
use chainbroker_engine::{
    add_interfaces, attach_satisfied, remove_interfaces, set_interfaces, suggest_interfaces,
    ContractCatalog, ContractImporter, MemoryCatalog, MockChain, ObservedCode,
};
use chainbroker_rpc::{TransactionInfo, TransactionReceipt};

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn catalog() -> MemoryCatalog {
    let catalog = MemoryCatalog::new();
    catalog
        .load_interfaces_str(
            r#"
- id: erc20
  name: ERC-20
  functions:
    - transfer(address,uint256)
    - balanceOf(address)
    - totalSupply()
  events:
    - Transfer(address,address,uint256)
- id: i
  functions: ["f1()", "f2()"]
- id: ownable
  functions: ["owner()", "transferOwnership(address)"]
"#,
        )
        .unwrap();
    catalog
}

fn with_functions(sigs: &[&str]) -> ContractDescriptor {
    let mut c = ContractDescriptor::new("c", "C");
    for sig in sigs {
        c.add_function(FunctionDescriptor::from_signature(sig).unwrap())
            .unwrap();
    }
    c
}

/// Runtime code that pushes each selector, the way a dispatcher does.
fn dispatcher_code(sigs: &[&str]) -> Vec<u8> {
    let mut code = vec![0x60, 0x80, 0x60, 0x40, 0x52];
    for sig in sigs {
        code.push(0x63);
        code.extend_from_slice(&selector(sig));
        code.extend_from_slice(&[0x14, 0x61, 0x00, 0x10, 0x57]);
    }
    code.push(0x00);
    code
}

// ─── Matching ─────────────────────────────────────────────────────────────────

#[test]
fn subset_contract_keeps_declared_interface_until_removed() {
    let catalog = catalog();
    let mut c = with_functions(&["f1()", "f2()", "f3()"]);

    let suggestions = suggest_interfaces(&c, &catalog);
    assert_eq!(suggestions.best, ["i"]);
    add_interfaces(&mut c, ["i"], &catalog).unwrap();
    assert!(c.implements.contains("i"));

    // The contract loses f2.
    c.functions.retain(|f| f.signature != "f2()");
    let err = add_interfaces(&mut c, ["i"], &catalog).unwrap_err();
    match err {
        BrokerError::IncompatibleInterface {
            interface_id,
            missing,
        } => {
            assert_eq!(interface_id, "i");
            assert_eq!(missing, ["f2()"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(set_interfaces(&mut c, ["i"], &catalog).is_err());

    // Still declared until removed explicitly.
    assert!(c.implements.contains("i"));
    assert!(suggest_interfaces(&c, &catalog).ranked.is_empty());
    remove_interfaces(&mut c, ["i"]);
    assert!(c.implements.is_empty());
}

#[test]
fn suggestions_flag_declared_interfaces() {
    let catalog = catalog();
    let mut c = with_functions(&["f1()", "f2()", "owner()", "transferOwnership(address)"]);
    c.implements.insert("ownable".into());
    let s = suggest_interfaces(&c, &catalog);
    let ranked: Vec<_> = s
        .ranked
        .iter()
        .map(|m| (m.interface_id.as_str(), m.matched_count, m.already_implemented))
        .collect();
    assert_eq!(ranked, [("i", 2, false), ("ownable", 2, true)]);
    assert_eq!(s.best, ["i", "ownable"]);
}

#[test]
fn manifest_without_signatures_is_never_suggested() {
    let catalog = MemoryCatalog::new();
    catalog
        .add_interface(InterfaceManifest::new(
            "empty",
            Vec::<String>::new(),
            Vec::<String>::new(),
        ))
        .unwrap();
    let mut c = ContractDescriptor::new("c", "C");
    c.add_function(FunctionDescriptor::provisional([1, 2, 3, 4]))
        .unwrap();

    let s = suggest_interfaces(&c, &catalog);
    assert!(s.ranked.is_empty());
    assert!(s.best.is_empty());
    assert!(attach_satisfied(&mut c, &catalog).is_empty());
    assert!(c.implements.is_empty());
}

#[test]
fn loosely_written_manifest_matches_canonical_signatures() {
    let catalog = MemoryCatalog::new();
    catalog
        .load_interfaces_str(
            r#"
id: token
functions: ["transfer(address, uint)", "balanceOf( address )"]
"#,
        )
        .unwrap();
    let mut c = with_functions(&["transfer(address,uint256)", "balanceOf(address)"]);
    assert_eq!(suggest_interfaces(&c, &catalog).best, ["token"]);
    add_interfaces(&mut c, ["token"], &catalog).unwrap();
    assert!(c.implements.contains("token"));
}

// ─── Import ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn import_synthesizes_provisional_descriptor() {
    let catalog = catalog();
    let address = Address::repeat_byte(0x42);
    let chain = MockChain::new();
    let mut code = dispatcher_code(&[
        "transfer(address,uint256)",
        "balanceOf(address)",
        "totalSupply()",
        "mint(address,uint256)",
    ]);
    code.push(0x7f);
    code.extend_from_slice(
        chainbroker_core::signature::topic("Transfer(address,address,uint256)").as_slice(),
    );
    chain.set_code(address, code);

    let importer = ContractImporter::new(&catalog, &catalog);
    let imported = importer.import(&chain, address, 1).await.unwrap();
    let d = &imported.descriptor;

    assert!(imported.proxy.is_none());
    assert!(d.provisional);
    assert_eq!(d.id, format!("imported-{}-1", address.to_string().to_lowercase()));
    assert_eq!(d.functions.len(), 4);
    assert_eq!(d.functions.iter().filter(|f| f.provisional).count(), 1);
    assert!(d.function_by_name("transfer").is_some());
    assert_eq!(d.events.len(), 1);
    assert!(d.implements.contains("erc20"));
    assert!(catalog.get_contract(&d.id).is_some());
}

#[tokio::test]
async fn import_follows_proxy_implementation() {
    let catalog = catalog();
    let proxy = Address::repeat_byte(0x01);
    let implementation = Address::repeat_byte(0x02);
    let chain = MockChain::new();
    chain.set_code(proxy, dispatcher_code(&[]));
    chain.set_storage(proxy, EIP1967_IMPL_SLOT, implementation.into_word());
    chain.set_code(implementation, dispatcher_code(&["owner()", "transferOwnership(address)"]));

    let imported = ContractImporter::new(&catalog, &catalog)
        .import(&chain, proxy, 5)
        .await
        .unwrap();
    assert_eq!(imported.proxy.unwrap().implementation, implementation);
    assert!(imported.descriptor.implements.contains("ownable"));
}

#[tokio::test]
async fn import_of_empty_address_fails() {
    let catalog = catalog();
    let err = ContractImporter::new(&catalog, &catalog)
        .import(&MockChain::new(), Address::repeat_byte(9), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, BrokerError::ContractNotDeployed { .. }));
}

#[test]
fn observed_selectors_from_dispatcher() {
    let observed = ObservedCode::scan(&dispatcher_code(&["f1()", "f2()"]));
    assert_eq!(observed.selectors.len(), 2);
    assert!(observed.selectors.contains(&selector("f1()")));
}


// ─── Deployments and ABI files ────────────────────────────────────────────────

const CREATION_CODE: [u8; 5] = [0x60, 0x80, 0x60, 0x40, 0x52];

fn deployable() -> ContractDescriptor {
    let mut d = ContractDescriptor::new("token-v1", "Token");
    d.constructors.push(ConstructorDescriptor {
        inputs: vec![
            Param::new("supply", "uint256".parse().unwrap()),
            Param::new("owner", "address".parse().unwrap()),
        ],
    });
    d.code_template = Some(Bytes::from(CREATION_CODE.to_vec()));
    d
}

fn deployment(chain: &MockChain, hash: B256, input: Vec<u8>, created: Address) {
    let from = Address::repeat_byte(0xee);
    chain.insert_receipt(TransactionReceipt {
        transaction_hash: hash,
        block_number: 7,
        success: true,
        from,
        to: None,
        contract_address: Some(created),
        logs: vec![],
    });
    chain.insert_transaction(TransactionInfo {
        hash,
        from,
        to: None,
        input: Bytes::from(input),
        value: U256::ZERO,
        block_number: Some(7),
    });
}

#[tokio::test]
async fn adopts_matching_deployment() {
    let catalog = MemoryCatalog::new();
    let descriptor = deployable();
    catalog.put_contract(descriptor.clone()).unwrap();

    let owner = Address::repeat_byte(0x0b);
    let args = vec![ParameterValue::uint(U256::from(1_000u64)), ParameterValue::address(owner)];
    let types: Vec<_> = descriptor.constructors[0].inputs.iter().map(|p| p.ty.clone()).collect();
    let mut input = CREATION_CODE.to_vec();
    input.extend(encode_params(&types, &args).unwrap());

    let chain = MockChain::new();
    let hash = B256::repeat_byte(0x11);
    let created = Address::repeat_byte(0xc0);
    deployment(&chain, hash, input, created);

    let adopted = ContractImporter::new(&catalog, &catalog)
        .adopt_deployment(&chain, hash, "token-v1")
        .await
        .unwrap();
    assert_eq!(adopted.descriptor_id, "token-v1");
    assert_eq!(adopted.contract_address, created);
    match adopted.arguments {
        ConstructorArguments::Verified { arguments } => {
            assert_eq!(arguments[0], ("supply".to_string(), args[0].clone()));
            assert_eq!(arguments[1], ("owner".to_string(), args[1].clone()));
        }
        other => panic!("expected verified arguments, got {other:?}"),
    }
}

#[tokio::test]
async fn deployment_with_other_bytecode_is_rejected() {
    let catalog = MemoryCatalog::new();
    catalog.put_contract(deployable()).unwrap();
    let chain = MockChain::new();
    let hash = B256::repeat_byte(0x12);
    deployment(&chain, hash, vec![0x60, 0x00, 0x00], Address::repeat_byte(0xc1));

    let importer = ContractImporter::new(&catalog, &catalog);
    let err = importer.adopt_deployment(&chain, hash, "token-v1").await.unwrap_err();
    assert!(matches!(err, BrokerError::BinaryMismatch { .. }));

    let err = importer.adopt_deployment(&chain, hash, "unknown").await.unwrap_err();
    assert!(matches!(err, BrokerError::NotFound { .. }));
}

#[test]
fn abi_file_loads_into_catalog_and_decodes_calls() {
    let abi = r#"[
        {"type":"function","name":"transfer","stateMutability":"nonpayable",
         "inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}],
         "outputs":[{"name":"","type":"bool"}]}
    ]"#;
    let path = std::env::temp_dir().join(format!("chainbroker-abi-{}.json", std::process::id()));
    std::fs::write(&path, abi).unwrap();

    let catalog = MemoryCatalog::new();
    let loaded = catalog.load_contract_abi("erc20", "Token", &path);
    std::fs::remove_file(&path).ok();
    loaded.unwrap();

    let stored = catalog.get_contract("erc20").unwrap();
    let transfer = stored.function_by_name("transfer").unwrap();
    let args = vec![
        ParameterValue::address(Address::repeat_byte(0x0b)),
        ParameterValue::uint(U256::from(10u64)),
    ];
    let data = encode_call(transfer, &args).unwrap();
    let matched = match_function(&data, &stored.functions).unwrap();
    let call = decode_call(&data, matched).unwrap();
    assert_eq!(call.arguments[0], ("to".to_string(), args[0].clone()));
    assert_eq!(call.arguments[1], ("amount".to_string(), args[1].clone()));
}

#[test]
fn missing_abi_file_is_config_error() {
    let catalog = MemoryCatalog::new();
    let err = catalog
        .load_contract_abi("x", "X", std::path::Path::new("/nonexistent/abi.json"))
        .unwrap_err();
    assert!(matches!(err, BrokerError::Config { .. }));
}
