//! Function selector resolution and call data decoding.
//!
//! - First 4 bytes of call data = keccak256(signature)[:4] (the selector)
//! - Remaining bytes = the encoded input parameter list
//! - Constructor arguments carry no selector; they follow the creation code

use crate::codec::{self, component_name};
use alloy_primitives::{Bytes, B256};
use chainbroker_core::{
    signature::{self, Selector},
    AbiError, CallDecoding, ConstructorDescriptor, ContractDescriptor, DecodedCall,
    FunctionDescriptor, ParameterValue, Param, ProvisionalArgument, ProvisionalCall,
};
use serde::Serialize;

/// First candidate, in declaration order, whose selector prefixes `call_data`.
pub fn match_function<'a>(
    call_data: &[u8],
    candidates: &'a [FunctionDescriptor],
) -> Option<&'a FunctionDescriptor> {
    let selector = leading_selector(call_data)?;
    candidates.iter().find(|f| f.selector == selector)
}

/// Decodes the inputs of `descriptor` from `call_data[4..]`.
pub fn decode_call(
    call_data: &[u8],
    descriptor: &FunctionDescriptor,
) -> Result<DecodedCall, AbiError> {
    let selector = leading_selector(call_data).ok_or_else(|| {
        AbiError::decoding(format!(
            "call data too short: {} bytes (need at least 4 for selector)",
            call_data.len()
        ))
    })?;
    if selector != descriptor.selector {
        return Err(AbiError::decoding(format!(
            "selector {} does not belong to {}",
            signature::selector_hex(&selector),
            descriptor.signature
        )));
    }
    if descriptor.provisional {
        return Err(AbiError::decoding(format!(
            "{} has no known signature to decode against",
            descriptor.signature
        )));
    }

    let arguments = decode_named(&descriptor.inputs, &call_data[4..])?;
    Ok(DecodedCall {
        function_name: descriptor.name.clone(),
        signature: descriptor.signature.clone(),
        selector,
        arguments,
    })
}

/// Matches and decodes, refusing to guess when nothing matches.
pub fn decode_call_strict(
    call_data: &[u8],
    candidates: &[FunctionDescriptor],
) -> Result<DecodedCall, AbiError> {
    match match_function(call_data, candidates) {
        Some(f) if !f.provisional => decode_call(call_data, f),
        _ => Err(AbiError::NoMatchingFunction {
            selector: hex::encode(call_data.get(..4).unwrap_or(call_data)),
        }),
    }
}

/// Matches and decodes, falling back to a provisional word split when no
/// verified descriptor matches the selector.
pub fn decode_call_lenient(
    call_data: &[u8],
    candidates: &[FunctionDescriptor],
) -> Result<CallDecoding, AbiError> {
    match match_function(call_data, candidates) {
        Some(f) if !f.provisional => decode_call(call_data, f).map(CallDecoding::Verified),
        _ => {
            let selector = leading_selector(call_data);
            let body = if selector.is_some() { &call_data[4..] } else { call_data };
            tracing::debug!(
                selector = ?selector.map(|s| signature::selector_hex(&s)),
                len = call_data.len(),
                "no verified function for call data, splitting into words"
            );
            Ok(CallDecoding::Provisional(split_words(selector, body)))
        }
    }
}

/// Splits `data` into 32-byte words labelled `arg0`, `arg1`, ...
/// Bytes after the last whole word are kept in `trailing`.
pub fn split_words(selector: Option<Selector>, data: &[u8]) -> ProvisionalCall {
    let chunks = data.chunks_exact(32);
    let trailing = Bytes::from(chunks.remainder().to_vec());
    let arguments = chunks
        .enumerate()
        .map(|(i, word)| ProvisionalArgument {
            name: format!("arg{i}"),
            word: B256::from_slice(word),
        })
        .collect();
    ProvisionalCall {
        selector,
        arguments,
        trailing,
    }
}

/// `selector ++ encode(inputs, args)`.
pub fn encode_call(
    descriptor: &FunctionDescriptor,
    args: &[ParameterValue],
) -> Result<Bytes, AbiError> {
    if descriptor.provisional {
        return Err(AbiError::encoding(format!(
            "{} has no known signature to encode against",
            descriptor.signature
        )));
    }
    if args.len() != descriptor.inputs.len() {
        return Err(AbiError::encoding(format!(
            "{} expects {} arguments, got {}",
            descriptor.signature,
            descriptor.inputs.len(),
            args.len()
        )));
    }
    let mut out = descriptor.selector.to_vec();
    out.extend(codec::encode_params(&descriptor.input_types(), args)?);
    Ok(out.into())
}

/// Decodes `eth_call` return data against the function's outputs.
pub fn decode_output(
    descriptor: &FunctionDescriptor,
    data: &[u8],
) -> Result<Vec<(String, ParameterValue)>, AbiError> {
    decode_named(&descriptor.outputs, data)
}

/// Constructor arguments decoded against a declared constructor, or split
/// into words when the contract declares none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decoding", rename_all = "lowercase")]
pub enum ConstructorArguments {
    Verified {
        arguments: Vec<(String, ParameterValue)>,
    },
    Provisional(ProvisionalCall),
}

/// Decodes constructor arguments (the bytes after the creation code).
pub fn decode_constructor_args(
    contract: &ContractDescriptor,
    args: &[u8],
) -> Result<ConstructorArguments, AbiError> {
    match contract.constructors.first() {
        Some(ConstructorDescriptor { inputs }) => Ok(ConstructorArguments::Verified {
            arguments: decode_named(inputs, args)?,
        }),
        None => Ok(ConstructorArguments::Provisional(split_words(None, args))),
    }
}

fn decode_named(params: &[Param], data: &[u8]) -> Result<Vec<(String, ParameterValue)>, AbiError> {
    let types: Vec<_> = params.iter().map(|p| p.ty.clone()).collect();
    let values = codec::decode_params(&types, data)?;
    Ok(params
        .iter()
        .enumerate()
        .zip(values)
        .map(|((i, p), v)| (component_name(&p.name, i), v))
        .collect())
}

fn leading_selector(call_data: &[u8]) -> Option<Selector> {
    call_data.get(..4)?.try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, U256};
    use chainbroker_core::TypeDescriptor;

    fn set_owner() -> FunctionDescriptor {
        FunctionDescriptor::new(
            "setOwner",
            vec![Param::new("newOwner", TypeDescriptor::address())],
            vec![],
            false,
        )
    }

    fn transfer() -> FunctionDescriptor {
        FunctionDescriptor::new(
            "transfer",
            vec![
                Param::new("to", TypeDescriptor::address()),
                Param::new("amount", TypeDescriptor::uint(256)),
            ],
            vec![Param::new("", "bool".parse().unwrap())],
            false,
        )
    }

    #[test]
    fn set_owner_encodes_and_decodes() {
        let owner: Address = "0x000000000000000000000000000000000000000b".parse().unwrap();
        let data = encode_call(&set_owner(), &[ParameterValue::address(owner)]).unwrap();
        assert_eq!(
            hex::encode(&data),
            "13af4035000000000000000000000000000000000000000000000000000000000000000b"
        );

        let candidates = [transfer(), set_owner()];
        let f = match_function(&data, &candidates).unwrap();
        assert_eq!(f.name, "setOwner");
        let call = decode_call(&data, f).unwrap();
        assert_eq!(call.arguments.len(), 1);
        assert_eq!(call.arguments[0].0, "newOwner");
        assert_eq!(call.argument("newOwner"), Some(&ParameterValue::address(owner)));
        assert_eq!(call.selector_hex(), "0x13af4035");
    }

    #[test]
    fn first_match_in_declaration_order_wins() {
        let mut twin = set_owner();
        twin.name = "shadow".into();
        let candidates = [set_owner(), twin];
        let data = encode_call(&set_owner(), &[ParameterValue::address(Address::ZERO)]).unwrap();
        assert_eq!(match_function(&data, &candidates).unwrap().name, "setOwner");
    }

    #[test]
    fn short_call_data_matches_nothing() {
        assert!(match_function(&[0x13, 0xaf], &[set_owner()]).is_none());
        assert!(decode_call(&[0x13], &set_owner()).is_err());
    }

    #[test]
    fn strict_decode_reports_no_match() {
        let err = decode_call_strict(&[0xde, 0xad, 0xbe, 0xef, 0, 0], &[set_owner()]).unwrap_err();
        assert_eq!(
            err,
            AbiError::NoMatchingFunction {
                selector: "deadbeef".into()
            }
        );
    }

    #[test]
    fn lenient_decode_falls_back_to_words() {
        let mut data = vec![0xde, 0xad, 0xbe, 0xef];
        data.extend([1u8; 32]);
        data.extend([2u8; 32]);
        data.extend([3u8; 5]);
        let decoded = decode_call_lenient(&data, &[set_owner()]).unwrap();
        assert!(!decoded.is_verified());
        let CallDecoding::Provisional(call) = decoded else {
            panic!("expected provisional decode");
        };
        assert_eq!(call.selector, Some([0xde, 0xad, 0xbe, 0xef]));
        assert_eq!(call.arguments.len(), 2);
        assert_eq!(call.arguments[1].name, "arg1");
        assert_eq!(call.arguments[1].word, B256::repeat_byte(2));
        assert_eq!(call.trailing.len(), 5);
        assert_eq!(
            call.values()[0].1,
            ParameterValue::fixed_bytes(vec![1u8; 32])
        );
    }

    #[test]
    fn lenient_decode_verifies_known_functions() {
        let data = encode_call(
            &transfer(),
            &[ParameterValue::address(Address::repeat_byte(9)), ParameterValue::uint(U256::from(5u64))],
        )
        .unwrap();
        let decoded = decode_call_lenient(&data, &[transfer()]).unwrap();
        let call = decoded.verified().unwrap();
        assert_eq!(call.function_name, "transfer");
        assert_eq!(call.argument("amount"), Some(&ParameterValue::uint(U256::from(5u64))));
    }

    #[test]
    fn provisional_descriptor_is_never_verified() {
        let provisional = FunctionDescriptor::provisional([0xde, 0xad, 0xbe, 0xef]);
        let data = [0xde, 0xad, 0xbe, 0xef];
        assert!(decode_call_strict(&data, std::slice::from_ref(&provisional)).is_err());
        let decoded = decode_call_lenient(&data, &[provisional]).unwrap();
        assert!(!decoded.is_verified());
    }

    #[test]
    fn wrong_argument_count_is_encoding_error() {
        let err = encode_call(&transfer(), &[ParameterValue::uint(U256::from(1u64))]).unwrap_err();
        assert!(matches!(err, AbiError::Encoding { .. }));
    }

    #[test]
    fn decodes_outputs_with_positional_names() {
        let mut word = [0u8; 32];
        word[31] = 1;
        let out = decode_output(&transfer(), &word).unwrap();
        assert_eq!(out, vec![("arg0".to_string(), ParameterValue::bool(true))]);
    }

    #[test]
    fn constructor_args_fall_back_without_constructor() {
        let mut contract = ContractDescriptor::new("c", "C");
        let args = [0u8; 64];
        let decoded = decode_constructor_args(&contract, &args).unwrap();
        assert!(matches!(decoded, ConstructorArguments::Provisional(ref p) if p.arguments.len() == 2));

        contract.constructors.push(ConstructorDescriptor {
            inputs: vec![
                Param::new("supply", TypeDescriptor::uint(256)),
                Param::new("owner", TypeDescriptor::address()),
            ],
        });
        let decoded = decode_constructor_args(&contract, &args).unwrap();
        assert_eq!(
            decoded,
            ConstructorArguments::Verified {
                arguments: vec![
                    ("supply".into(), ParameterValue::uint(U256::from(0u64))),
                    ("owner".into(), ParameterValue::address(Address::ZERO)),
                ]
            }
        );
    }
}
