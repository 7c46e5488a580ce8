//! Conversion between loose JSON input and typed values.
//!
//! Callers hand over arguments as JSON: integers as numbers or decimal/hex
//! strings, byte values and addresses as hex strings, tuples as arrays or
//! objects. Anything that does not fit the declared type is an encoding
//! error; nothing is guessed.

use alloy_primitives::{Address, I256, U256};
use chainbroker_core::{AbiError, ParameterValue, ScalarKind, ScalarValue, TypeDescriptor};
use serde_json::{Map, Value};
use std::str::FromStr;

pub fn value_from_json(ty: &TypeDescriptor, json: &Value) -> Result<ParameterValue, AbiError> {
    match ty {
        TypeDescriptor::Scalar(kind) => scalar_from_json(*kind, json).map(ParameterValue::Scalar),
        TypeDescriptor::Array { element, .. } => {
            let items = json
                .as_array()
                .ok_or_else(|| mismatch(ty, json))?
                .iter()
                .map(|item| value_from_json(element, item))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ParameterValue::List(items))
        }
        TypeDescriptor::Tuple(components) => {
            let values: Vec<&Value> = match json {
                Value::Array(items) => items.iter().collect(),
                Value::Object(fields) => components
                    .iter()
                    .map(|c| {
                        fields.get(&c.name).ok_or_else(|| {
                            AbiError::encoding(format!("missing tuple field '{}'", c.name))
                        })
                    })
                    .collect::<Result<_, _>>()?,
                _ => return Err(mismatch(ty, json)),
            };
            if values.len() != components.len() {
                return Err(AbiError::encoding(format!(
                    "{ty} has {} components, got {}",
                    components.len(),
                    values.len()
                )));
            }
            let fields = components
                .iter()
                .zip(values)
                .map(|(c, v)| Ok((c.name.clone(), value_from_json(&c.ty, v)?)))
                .collect::<Result<Vec<_>, AbiError>>()?;
            Ok(ParameterValue::Struct(fields))
        }
    }
}

/// Converts a list of JSON arguments against declared types.
pub fn values_from_json(
    types: &[TypeDescriptor],
    json: &[Value],
) -> Result<Vec<ParameterValue>, AbiError> {
    if types.len() != json.len() {
        return Err(AbiError::encoding(format!(
            "expected {} arguments, got {}",
            types.len(),
            json.len()
        )));
    }
    types
        .iter()
        .zip(json)
        .map(|(ty, v)| value_from_json(ty, v))
        .collect()
}

fn scalar_from_json(kind: ScalarKind, json: &Value) -> Result<ScalarValue, AbiError> {
    let bad = || {
        AbiError::encoding(format!("cannot use {json} as {kind}"))
    };
    let value = match kind {
        ScalarKind::Address => {
            let s = json.as_str().ok_or_else(bad)?;
            ScalarValue::Address(Address::from_str(s.trim()).map_err(|_| bad())?)
        }
        ScalarKind::Bool => match json {
            Value::Bool(b) => ScalarValue::Bool(*b),
            Value::String(s) if s == "true" => ScalarValue::Bool(true),
            Value::String(s) if s == "false" => ScalarValue::Bool(false),
            _ => return Err(bad()),
        },
        ScalarKind::Uint(_) => {
            let text = numeric_text(json).ok_or_else(bad)?;
            ScalarValue::Uint(U256::from_str(&text).map_err(|_| bad())?)
        }
        ScalarKind::Int(_) => {
            let text = numeric_text(json).ok_or_else(bad)?;
            ScalarValue::Int(I256::from_str(&text).map_err(|_| bad())?)
        }
        ScalarKind::FixedBytes(n) => {
            let bytes = hex_bytes(json).ok_or_else(bad)?;
            if bytes.len() != n as usize {
                return Err(AbiError::encoding(format!(
                    "bytes{n} needs {n} bytes, got {}",
                    bytes.len()
                )));
            }
            ScalarValue::FixedBytes(bytes)
        }
        ScalarKind::Bytes => ScalarValue::Bytes(hex_bytes(json).ok_or_else(bad)?),
        ScalarKind::String => ScalarValue::String(json.as_str().ok_or_else(bad)?.to_string()),
    };
    Ok(value)
}

/// Integer literal text from a JSON number or string; floats are rejected.
fn numeric_text(json: &Value) -> Option<String> {
    match json {
        Value::Number(n) if n.is_u64() || n.is_i64() => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn hex_bytes(json: &Value) -> Option<Vec<u8>> {
    let s = json.as_str()?.trim();
    hex::decode(s.strip_prefix("0x").unwrap_or(s)).ok()
}

fn mismatch(ty: &TypeDescriptor, json: &Value) -> AbiError {
    AbiError::encoding(format!("cannot use {json} as {ty}"))
}

/// Renders a value for output: integers as decimal strings, byte values as
/// 0x-hex, addresses checksummed.
pub fn value_to_json(value: &ParameterValue) -> Value {
    match value {
        ParameterValue::Scalar(ScalarValue::Bool(b)) => Value::Bool(*b),
        ParameterValue::Scalar(s) => Value::String(s.to_string()),
        ParameterValue::List(items) => Value::Array(items.iter().map(value_to_json).collect()),
        ParameterValue::Struct(fields) => {
            let map: Map<String, Value> = fields
                .iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect();
            Value::Object(map)
        }
    }
}

/// Named values as a JSON object, keeping the first value for repeated names.
pub fn named_to_json(values: &[(String, ParameterValue)]) -> Value {
    let mut map = Map::new();
    for (name, value) in values {
        map.entry(name.clone()).or_insert_with(|| value_to_json(value));
    }
    Value::Object(map)
}
