//! Typed ABI values.
//!
//! `TypeDescriptor` describes the shape of a parameter and `ParameterValue`
//! mirrors it with concrete data. Both are plain sum types; the codec in
//! `chainbroker-abi` dispatches on the variant tag.

use crate::error::AbiError;
use alloy_primitives::{Address, I256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Leaf kinds of the ABI type system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    /// 20-byte account address
    Address,
    Bool,
    /// Unsigned integer, width in bits (8..=256, multiple of 8)
    Uint(u16),
    /// Signed integer, width in bits (8..=256, multiple of 8)
    Int(u16),
    /// Fixed-size byte array, length in bytes (1..=32)
    FixedBytes(u8),
    /// Variable-length byte array
    Bytes,
    /// UTF-8 string
    String,
}

impl ScalarKind {
    /// Whether values of this kind live in the tail region.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, ScalarKind::Bytes | ScalarKind::String)
    }

    fn parse(s: &str) -> Result<Self, AbiError> {
        let kind = match s {
            "address" => ScalarKind::Address,
            "bool" => ScalarKind::Bool,
            "string" => ScalarKind::String,
            "bytes" => ScalarKind::Bytes,
            "uint" => ScalarKind::Uint(256),
            "int" => ScalarKind::Int(256),
            _ => {
                if let Some(bits) = s.strip_prefix("uint") {
                    ScalarKind::Uint(parse_int_width(s, bits)?)
                } else if let Some(bits) = s.strip_prefix("int") {
                    ScalarKind::Int(parse_int_width(s, bits)?)
                } else if let Some(len) = s.strip_prefix("bytes") {
                    let n: u8 = len.parse().map_err(|_| invalid_type(s))?;
                    if !(1..=32).contains(&n) {
                        return Err(invalid_type(s));
                    }
                    ScalarKind::FixedBytes(n)
                } else {
                    return Err(invalid_type(s));
                }
            }
        };
        Ok(kind)
    }
}

fn parse_int_width(full: &str, bits: &str) -> Result<u16, AbiError> {
    let n: u16 = bits.parse().map_err(|_| invalid_type(full))?;
    if n == 0 || n > 256 || n % 8 != 0 {
        return Err(invalid_type(full));
    }
    Ok(n)
}

fn invalid_type(s: &str) -> AbiError {
    AbiError::InvalidType { ty: s.to_string() }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarKind::Address => write!(f, "address"),
            ScalarKind::Bool => write!(f, "bool"),
            ScalarKind::Uint(bits) => write!(f, "uint{bits}"),
            ScalarKind::Int(bits) => write!(f, "int{bits}"),
            ScalarKind::FixedBytes(n) => write!(f, "bytes{n}"),
            ScalarKind::Bytes => write!(f, "bytes"),
            ScalarKind::String => write!(f, "string"),
        }
    }
}

/// A named, typed slot: a function input/output or a tuple component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeDescriptor,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Recursive description of an ABI type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "of", rename_all = "lowercase")]
pub enum TypeDescriptor {
    Scalar(ScalarKind),
    /// Ordered, named components
    Tuple(Vec<Param>),
    /// `T[N]` when `length` is set, `T[]` otherwise
    Array {
        element: Box<TypeDescriptor>,
        length: Option<usize>,
    },
}

impl TypeDescriptor {
    pub fn address() -> Self {
        TypeDescriptor::Scalar(ScalarKind::Address)
    }

    pub fn uint(bits: u16) -> Self {
        TypeDescriptor::Scalar(ScalarKind::Uint(bits))
    }

    pub fn dynamic_array(element: TypeDescriptor) -> Self {
        TypeDescriptor::Array {
            element: Box::new(element),
            length: None,
        }
    }

    pub fn fixed_array(element: TypeDescriptor, length: usize) -> Self {
        TypeDescriptor::Array {
            element: Box::new(element),
            length: Some(length),
        }
    }

    /// A type is dynamic when it, or anything it contains, has a
    /// data-dependent encoded length.
    pub fn is_dynamic(&self) -> bool {
        match self {
            TypeDescriptor::Scalar(kind) => kind.is_dynamic(),
            TypeDescriptor::Tuple(components) => components.iter().any(|c| c.ty.is_dynamic()),
            TypeDescriptor::Array { length: None, .. } => true,
            TypeDescriptor::Array {
                element,
                length: Some(_),
            } => element.is_dynamic(),
        }
    }

    /// Bytes this type occupies in the head region of an enclosing tuple.
    pub fn head_size(&self) -> usize {
        if self.is_dynamic() {
            return 32;
        }
        match self {
            TypeDescriptor::Scalar(_) => 32,
            TypeDescriptor::Tuple(components) => components.iter().map(|c| c.ty.head_size()).sum(),
            TypeDescriptor::Array { element, length } => {
                element.head_size().saturating_mul(length.unwrap_or(0))
            }
        }
    }

    /// Indexed event parameters of these types are stored as a keccak hash
    /// of their encoding instead of the value itself.
    pub fn is_hashed_when_indexed(&self) -> bool {
        match self {
            TypeDescriptor::Scalar(kind) => kind.is_dynamic(),
            TypeDescriptor::Tuple(_) | TypeDescriptor::Array { .. } => true,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Scalar(kind) => write!(f, "{kind}"),
            TypeDescriptor::Tuple(components) => {
                let parts: Vec<_> = components.iter().map(|c| c.ty.to_string()).collect();
                write!(f, "({})", parts.join(","))
            }
            TypeDescriptor::Array {
                element,
                length: Some(n),
            } => write!(f, "{element}[{n}]"),
            TypeDescriptor::Array {
                element,
                length: None,
            } => write!(f, "{element}[]"),
        }
    }
}

impl FromStr for TypeDescriptor {
    type Err = AbiError;

    /// Parses canonical type strings such as `uint256`, `(address,bytes)[]`
    /// or `bytes32[4]`. Tuple components parsed this way are unnamed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.ends_with(']') {
            let open = s.rfind('[').ok_or_else(|| invalid_type(s))?;
            let element: TypeDescriptor = s[..open].parse()?;
            let len = &s[open + 1..s.len() - 1];
            let length = if len.is_empty() {
                None
            } else {
                Some(len.parse::<usize>().map_err(|_| invalid_type(s))?)
            };
            return Ok(TypeDescriptor::Array {
                element: Box::new(element),
                length,
            });
        }
        if let Some(inner) = s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
            let components = split_top_level(inner)
                .ok_or_else(|| invalid_type(s))?
                .into_iter()
                .map(|part| Ok(Param::new("", part.parse()?)))
                .collect::<Result<Vec<_>, AbiError>>()?;
            return Ok(TypeDescriptor::Tuple(components));
        }
        ScalarKind::parse(s).map(TypeDescriptor::Scalar)
    }
}

/// Splits a comma-separated list, ignoring commas nested inside parentheses.
/// Returns `None` on unbalanced input.
pub fn split_top_level(s: &str) -> Option<Vec<&str>> {
    if s.trim().is_empty() {
        return Some(Vec::new());
    }
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, ch) in s.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    parts.push(&s[start..]);
    Some(parts)
}

/// A leaf value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ScalarValue {
    Address(Address),
    Bool(bool),
    Uint(U256),
    Int(I256),
    /// Exactly N bytes for a `bytesN` slot
    FixedBytes(Vec<u8>),
    Bytes(Vec<u8>),
    String(String),
}

impl ScalarValue {
    /// Short name of the value's shape, used in error messages.
    pub fn shape(&self) -> &'static str {
        match self {
            ScalarValue::Address(_) => "address",
            ScalarValue::Bool(_) => "bool",
            ScalarValue::Uint(_) => "uint",
            ScalarValue::Int(_) => "int",
            ScalarValue::FixedBytes(_) => "fixed bytes",
            ScalarValue::Bytes(_) => "bytes",
            ScalarValue::String(_) => "string",
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Address(a) => write!(f, "{a}"),
            ScalarValue::Bool(b) => write!(f, "{b}"),
            ScalarValue::Uint(v) => write!(f, "{v}"),
            ScalarValue::Int(v) => write!(f, "{v}"),
            ScalarValue::FixedBytes(b) | ScalarValue::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            ScalarValue::String(s) => write!(f, "{s}"),
        }
    }
}

/// A decoded or to-be-encoded value, shaped like its `TypeDescriptor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ParameterValue {
    Scalar(ScalarValue),
    Struct(Vec<(String, ParameterValue)>),
    List(Vec<ParameterValue>),
}

impl ParameterValue {
    pub fn address(a: Address) -> Self {
        ParameterValue::Scalar(ScalarValue::Address(a))
    }

    pub fn uint(v: impl Into<U256>) -> Self {
        ParameterValue::Scalar(ScalarValue::Uint(v.into()))
    }

    pub fn int(v: I256) -> Self {
        ParameterValue::Scalar(ScalarValue::Int(v))
    }

    pub fn bool(v: bool) -> Self {
        ParameterValue::Scalar(ScalarValue::Bool(v))
    }

    pub fn string(s: impl Into<String>) -> Self {
        ParameterValue::Scalar(ScalarValue::String(s.into()))
    }

    pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
        ParameterValue::Scalar(ScalarValue::Bytes(b.into()))
    }

    pub fn fixed_bytes(b: impl Into<Vec<u8>>) -> Self {
        ParameterValue::Scalar(ScalarValue::FixedBytes(b.into()))
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            ParameterValue::Scalar(ScalarValue::Address(a)) => Some(*a),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<U256> {
        match self {
            ParameterValue::Scalar(ScalarValue::Uint(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn shape(&self) -> &'static str {
        match self {
            ParameterValue::Scalar(s) => s.shape(),
            ParameterValue::Struct(_) => "struct",
            ParameterValue::List(_) => "list",
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Scalar(s) => write!(f, "{s}"),
            ParameterValue::List(items) => {
                let parts: Vec<_> = items.iter().map(|x| x.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            ParameterValue::Struct(fields) => {
                let parts: Vec<_> = fields.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
        }
    }
}
