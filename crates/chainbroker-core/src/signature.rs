//! Canonical signatures, selectors and topics.
//!
//! A function selector is the first four bytes of
//! `keccak256("name(type1,type2,...)")`; an event topic is the full hash.
//!   keccak256("Transfer(address,address,uint256)")
//!   → 0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef

use crate::error::AbiError;
use crate::types::{split_top_level, Param, TypeDescriptor};
use alloy_primitives::B256;
use tiny_keccak::{Hasher, Keccak};

pub type Selector = [u8; 4];

pub fn keccak256(data: &[u8]) -> B256 {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut output);
    B256::from(output)
}

/// `name(t1,t2,...)` with tuples expanded to `(..)`.
pub fn canonical_signature<'a, I>(name: &str, input_types: I) -> String
where
    I: IntoIterator<Item = &'a TypeDescriptor>,
{
    let types: Vec<String> = input_types.into_iter().map(|t| t.to_string()).collect();
    format!("{name}({})", types.join(","))
}

pub fn selector(signature: &str) -> Selector {
    let hash = keccak256(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

pub fn topic(signature: &str) -> B256 {
    keccak256(signature.as_bytes())
}

pub fn selector_hex(selector: &Selector) -> String {
    format!("0x{}", hex::encode(selector))
}

/// Splits `name(t1,t2)` into its name and unnamed typed params.
///
/// Params are named `arg0`, `arg1`, ... since a signature carries no names.
pub fn parse_signature(signature: &str) -> Result<(String, Vec<Param>), AbiError> {
    let invalid = || AbiError::InvalidDescriptor {
        reason: format!("malformed signature '{signature}'"),
    };
    let open = signature.find('(').ok_or_else(invalid)?;
    let name = signature[..open].trim();
    let args = signature[open..]
        .trim()
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(invalid)?;
    if name.is_empty() {
        return Err(invalid());
    }
    let params = split_top_level(args)
        .ok_or_else(invalid)?
        .into_iter()
        .enumerate()
        .map(|(i, ty)| Ok(Param::new(format!("arg{i}"), ty.parse()?)))
        .collect::<Result<Vec<_>, AbiError>>()?;
    Ok((name.to_string(), params))
}
