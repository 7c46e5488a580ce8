//! Head/tail parameter codec.
//!
//! A sequence of values is laid out as a head region, one slot per value,
//! followed by a tail region. Static values sit inline in their head slot;
//! dynamic values put a 32-byte offset (relative to the start of the
//! sequence) in the head and their contents in the tail.
//!
//! Every read on the decode path is bounds checked: call data and logs come
//! from untrusted senders.

use alloy_primitives::{Address, I256, U256};
use chainbroker_core::{AbiError, ParameterValue, ScalarKind, ScalarValue, TypeDescriptor};

const WORD: usize = 32;

/// Encodes a single value the way it would appear as the only element of
/// a parameter list. Dynamic values therefore start with an offset word.
pub fn encode(ty: &TypeDescriptor, value: &ParameterValue) -> Result<Vec<u8>, AbiError> {
    encode_sequence(&[(ty, value)])
}

/// Encodes a parameter list (function inputs, event data, constructor args).
pub fn encode_params(
    types: &[TypeDescriptor],
    values: &[ParameterValue],
) -> Result<Vec<u8>, AbiError> {
    if types.len() != values.len() {
        return Err(AbiError::encoding(format!(
            "expected {} values, got {}",
            types.len(),
            values.len()
        )));
    }
    let items: Vec<_> = types.iter().zip(values).collect();
    encode_sequence(&items)
}

/// Decodes the head slot at `offset` of `data`, following the offset
/// pointer for dynamic types. Returns the value and the offset of the next
/// head slot.
pub fn decode(
    ty: &TypeDescriptor,
    data: &[u8],
    offset: usize,
) -> Result<(ParameterValue, usize), AbiError> {
    let value = Decoder::new(data).slot(ty, 0, offset)?;
    let next = offset
        .checked_add(ty.head_size())
        .ok_or_else(|| AbiError::decoding("offset overflow"))?;
    Ok((value, next))
}

/// Decodes a parameter list starting at the beginning of `data`.
pub fn decode_params(
    types: &[TypeDescriptor],
    data: &[u8],
) -> Result<Vec<ParameterValue>, AbiError> {
    Decoder::new(data).sequence(types.iter(), 0)
}

// ─── encoding ────────────────────────────────────────────────────────────────

fn encode_sequence(items: &[(&TypeDescriptor, &ParameterValue)]) -> Result<Vec<u8>, AbiError> {
    let head_len: usize = items.iter().map(|(ty, _)| ty.head_size()).sum();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();
    for (ty, value) in items {
        let encoded = encode_value(ty, value)?;
        if ty.is_dynamic() {
            head.extend_from_slice(&usize_word(head_len + tail.len()));
            tail.extend_from_slice(&encoded);
        } else {
            head.extend_from_slice(&encoded);
        }
    }
    head.extend_from_slice(&tail);
    Ok(head)
}

fn encode_value(ty: &TypeDescriptor, value: &ParameterValue) -> Result<Vec<u8>, AbiError> {
    match (ty, value) {
        (TypeDescriptor::Scalar(kind), ParameterValue::Scalar(scalar)) => encode_scalar(*kind, scalar),
        (TypeDescriptor::Tuple(components), ParameterValue::Struct(fields)) => {
            if components.len() != fields.len() {
                return Err(AbiError::encoding(format!(
                    "tuple {ty} has {} components, got {} fields",
                    components.len(),
                    fields.len()
                )));
            }
            let items: Vec<_> = components
                .iter()
                .map(|c| &c.ty)
                .zip(fields.iter().map(|(_, v)| v))
                .collect();
            encode_sequence(&items)
        }
        (TypeDescriptor::Array { element, length }, ParameterValue::List(values)) => {
            if let Some(n) = length {
                if values.len() != *n {
                    return Err(AbiError::encoding(format!(
                        "{ty} needs exactly {n} elements, got {}",
                        values.len()
                    )));
                }
            }
            let items: Vec<_> = values.iter().map(|v| (element.as_ref(), v)).collect();
            let body = encode_sequence(&items)?;
            match length {
                Some(_) => Ok(body),
                None => {
                    let mut out = usize_word(values.len()).to_vec();
                    out.extend_from_slice(&body);
                    Ok(out)
                }
            }
        }
        _ => Err(AbiError::encoding(format!(
            "cannot encode {} as {ty}",
            value.shape()
        ))),
    }
}

fn encode_scalar(kind: ScalarKind, value: &ScalarValue) -> Result<Vec<u8>, AbiError> {
    let mut word = [0u8; WORD];
    match (kind, value) {
        (ScalarKind::Address, ScalarValue::Address(a)) => {
            word[12..].copy_from_slice(a.as_slice());
        }
        (ScalarKind::Bool, ScalarValue::Bool(b)) => {
            word[31] = u8::from(*b);
        }
        (ScalarKind::Uint(bits), ScalarValue::Uint(v)) => {
            if !uint_fits(v, bits) {
                return Err(AbiError::encoding(format!("{v} does not fit in uint{bits}")));
            }
            word = v.to_be_bytes::<32>();
        }
        (ScalarKind::Int(bits), ScalarValue::Int(v)) => {
            if !int_fits(v, bits) {
                return Err(AbiError::encoding(format!("{v} does not fit in int{bits}")));
            }
            word = v.into_raw().to_be_bytes::<32>();
        }
        (ScalarKind::FixedBytes(n), ScalarValue::FixedBytes(b)) => {
            if b.len() != n as usize {
                return Err(AbiError::encoding(format!(
                    "bytes{n} needs {n} bytes, got {}",
                    b.len()
                )));
            }
            word[..b.len()].copy_from_slice(b);
        }
        (ScalarKind::Bytes, ScalarValue::Bytes(b)) => return Ok(encode_packed_bytes(b)),
        (ScalarKind::String, ScalarValue::String(s)) => return Ok(encode_packed_bytes(s.as_bytes())),
        _ => {
            return Err(AbiError::encoding(format!(
                "cannot encode {} as {kind}",
                value.shape()
            )))
        }
    }
    Ok(word.to_vec())
}

/// Length word followed by the data, right padded to a word boundary.
fn encode_packed_bytes(data: &[u8]) -> Vec<u8> {
    let padded = data.len().div_ceil(WORD) * WORD;
    let mut out = Vec::with_capacity(WORD + padded);
    out.extend_from_slice(&usize_word(data.len()));
    out.extend_from_slice(data);
    out.resize(WORD + padded, 0);
    out
}

fn usize_word(n: usize) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[24..].copy_from_slice(&(n as u64).to_be_bytes());
    word
}

fn uint_fits(v: &U256, bits: u16) -> bool {
    bits >= 256 || (*v >> bits as usize).is_zero()
}

fn int_fits(v: &I256, bits: u16) -> bool {
    if bits >= 256 {
        return true;
    }
    // In range iff every bit from position bits-1 upward equals the sign bit.
    let raw = v.into_raw();
    let magnitude = if v.is_negative() { !raw } else { raw };
    (magnitude >> (bits as usize - 1)).is_zero()
}

// ─── decoding ────────────────────────────────────────────────────────────────

/// Decoded words allowed per word of input, on top of a fixed allowance.
/// A well-formed encoding never decodes more words than it holds; offsets
/// that alias the same tail region would otherwise multiply the output.
const BUDGET_FACTOR: usize = 2;
const BUDGET_SLACK: usize = 16;

/// Decoding state shared across one top-level call.
struct Decoder<'a> {
    data: &'a [u8],
    /// Words that may still be produced
    budget: usize,
}

impl<'a> Decoder<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            budget: (data.len() / WORD)
                .saturating_mul(BUDGET_FACTOR)
                .saturating_add(BUDGET_SLACK),
        }
    }

    fn charge(&mut self, words: usize) -> Result<(), AbiError> {
        self.budget = self.budget.checked_sub(words).ok_or_else(|| {
            AbiError::decoding(format!(
                "decoded output exceeds what a {}-byte input can hold",
                self.data.len()
            ))
        })?;
        Ok(())
    }

    fn sequence<'t, I>(&mut self, types: I, base: usize) -> Result<Vec<ParameterValue>, AbiError>
    where
        I: Iterator<Item = &'t TypeDescriptor>,
    {
        let mut head = base;
        let mut values = Vec::new();
        for ty in types {
            values.push(self.slot(ty, base, head)?);
            head = head
                .checked_add(ty.head_size())
                .ok_or_else(|| AbiError::decoding("offset overflow"))?;
        }
        Ok(values)
    }

    /// Decodes the head slot at `head` of a sequence that starts at `base`.
    fn slot(&mut self, ty: &TypeDescriptor, base: usize, head: usize) -> Result<ParameterValue, AbiError> {
        if !ty.is_dynamic() {
            return self.contents(ty, head);
        }
        let pointer = read_usize(self.data, head)?;
        let start = base
            .checked_add(pointer)
            .filter(|start| *start <= self.data.len())
            .ok_or_else(|| {
                AbiError::decoding(format!(
                    "offset {pointer} at byte {head} points outside the {}-byte buffer",
                    self.data.len()
                ))
            })?;
        self.contents(ty, start)
    }

    /// Decodes the contents of `ty` located at absolute position `pos`.
    fn contents(&mut self, ty: &TypeDescriptor, pos: usize) -> Result<ParameterValue, AbiError> {
        match ty {
            TypeDescriptor::Scalar(kind) => self.scalar(*kind, pos).map(ParameterValue::Scalar),
            TypeDescriptor::Tuple(components) => {
                let values = self.sequence(components.iter().map(|c| &c.ty), pos)?;
                let fields = components
                    .iter()
                    .enumerate()
                    .zip(values)
                    .map(|((i, c), v)| (component_name(&c.name, i), v))
                    .collect();
                Ok(ParameterValue::Struct(fields))
            }
            TypeDescriptor::Array { element, length } => {
                let (len, base) = match length {
                    Some(n) => (*n, pos),
                    None => {
                        let base = pos
                            .checked_add(WORD)
                            .ok_or_else(|| AbiError::decoding("offset overflow"))?;
                        (read_usize(self.data, pos)?, base)
                    }
                };
                // Every element needs at least its head slot, which caps how
                // many elements a buffer of this size can really hold.
                let available = self.data.len().saturating_sub(base);
                let min_size = element.head_size().max(1);
                if len > available / min_size {
                    return Err(AbiError::decoding(format!(
                        "{ty} claims {len} elements but only {available} bytes remain"
                    )));
                }
                // Zero-sized elements carry no leaf words of their own.
                if element.head_size() == 0 {
                    self.charge(len)?;
                }
                let values = self.sequence(std::iter::repeat(element.as_ref()).take(len), base)?;
                Ok(ParameterValue::List(values))
            }
        }
    }

    fn scalar(&mut self, kind: ScalarKind, pos: usize) -> Result<ScalarValue, AbiError> {
        let data = self.data;
        match kind {
            ScalarKind::Bytes | ScalarKind::String => {
                let bytes = read_packed_bytes(kind, data, pos)?;
                self.charge(1 + bytes.len().div_ceil(WORD))?;
                if kind == ScalarKind::Bytes {
                    return Ok(ScalarValue::Bytes(bytes.to_vec()));
                }
                String::from_utf8(bytes.to_vec())
                    .map(ScalarValue::String)
                    .map_err(|_| AbiError::decoding(format!("string at byte {pos} is not valid UTF-8")))
            }
            _ => {
                self.charge(1)?;
                decode_word(kind, data, pos)
            }
        }
    }
}

fn decode_word(kind: ScalarKind, data: &[u8], pos: usize) -> Result<ScalarValue, AbiError> {
    match kind {
        ScalarKind::Address => {
            let word = read_word(data, pos)?;
            if word[..12].iter().any(|b| *b != 0) {
                return Err(AbiError::decoding(format!("dirty address word at byte {pos}")));
            }
            Ok(ScalarValue::Address(Address::from_slice(&word[12..])))
        }
        ScalarKind::Bool => {
            let word = read_word(data, pos)?;
            if word[..31].iter().any(|b| *b != 0) || word[31] > 1 {
                return Err(AbiError::decoding(format!("invalid bool at byte {pos}")));
            }
            Ok(ScalarValue::Bool(word[31] == 1))
        }
        ScalarKind::Uint(bits) => {
            let v = U256::from_be_bytes(read_word(data, pos)?);
            if !uint_fits(&v, bits) {
                return Err(AbiError::decoding(format!("value at byte {pos} overflows uint{bits}")));
            }
            Ok(ScalarValue::Uint(v))
        }
        ScalarKind::Int(bits) => {
            let v = I256::from_raw(U256::from_be_bytes(read_word(data, pos)?));
            if !int_fits(&v, bits) {
                return Err(AbiError::decoding(format!("value at byte {pos} overflows int{bits}")));
            }
            Ok(ScalarValue::Int(v))
        }
        ScalarKind::FixedBytes(n) => {
            let word = read_word(data, pos)?;
            Ok(ScalarValue::FixedBytes(word[..n as usize].to_vec()))
        }
        ScalarKind::Bytes | ScalarKind::String => Err(AbiError::decoding(format!(
            "{kind} is not a single-word type"
        ))),
    }
}

/// Length word at `pos` followed by that many bytes.
fn read_packed_bytes(kind: ScalarKind, data: &[u8], pos: usize) -> Result<&[u8], AbiError> {
    let len = read_usize(data, pos)?;
    pos.checked_add(WORD)
        .and_then(|start| Some(start..start.checked_add(len)?))
        .and_then(|range| data.get(range))
        .ok_or_else(|| {
            AbiError::decoding(format!("{kind} of length {len} at byte {pos} overruns the buffer"))
        })
}

fn read_word(data: &[u8], pos: usize) -> Result<[u8; WORD], AbiError> {
    pos.checked_add(WORD)
        .and_then(|end| data.get(pos..end))
        .and_then(|slice| <[u8; WORD]>::try_from(slice).ok())
        .ok_or_else(|| {
            AbiError::decoding(format!(
                "need 32 bytes at byte {pos}, buffer has {}",
                data.len()
            ))
        })
}

/// Reads an offset or length word; values that cannot index memory are errors.
fn read_usize(data: &[u8], pos: usize) -> Result<usize, AbiError> {
    let word = read_word(data, pos)?;
    if word[..24].iter().any(|b| *b != 0) {
        return Err(AbiError::decoding(format!("offset/length at byte {pos} is out of range")));
    }
    let mut low = [0u8; 8];
    low.copy_from_slice(&word[24..]);
    usize::try_from(u64::from_be_bytes(low))
        .map_err(|_| AbiError::decoding(format!("offset/length at byte {pos} is out of range")))
}

pub(crate) fn component_name(name: &str, index: usize) -> String {
    if name.is_empty() {
        format!("arg{index}")
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainbroker_core::Param;

    fn ty(s: &str) -> TypeDescriptor {
        s.parse().unwrap()
    }

    fn roundtrip(t: &TypeDescriptor, v: ParameterValue) {
        let encoded = encode(t, &v).unwrap();
        let (decoded, next) = decode(t, &encoded, 0).unwrap();
        assert_eq!(decoded, v, "roundtrip of {t}");
        assert_eq!(next, t.head_size());
    }

    #[test]
    fn static_scalars_encode_inline() {
        let a = Address::repeat_byte(0xaa);
        let out = encode(&ty("address"), &ParameterValue::address(a)).unwrap();
        assert_eq!(out.len(), 32);
        assert_eq!(&out[..12], &[0u8; 12]);
        assert_eq!(&out[12..], a.as_slice());

        let out = encode(&ty("uint256"), &ParameterValue::uint(U256::from(10u64))).unwrap();
        assert_eq!(out[31], 10);
    }

    #[test]
    fn known_vector_uint_and_string() {
        // (uint256 1, string "abc")
        let out = encode_params(
            &[ty("uint256"), ty("string")],
            &[ParameterValue::uint(U256::from(1u64)), ParameterValue::string("abc")],
        )
        .unwrap();
        let expected = concat!(
            "0000000000000000000000000000000000000000000000000000000000000001",
            "0000000000000000000000000000000000000000000000000000000000000040",
            "0000000000000000000000000000000000000000000000000000000000000003",
            "6162630000000000000000000000000000000000000000000000000000000000",
        );
        assert_eq!(hex::encode(out), expected);
    }

    #[test]
    fn roundtrips_scalars() {
        roundtrip(&ty("bool"), ParameterValue::bool(true));
        roundtrip(&ty("uint8"), ParameterValue::uint(U256::from(255u64)));
        roundtrip(&ty("int16"), ParameterValue::int(I256::try_from(-32768i64).unwrap()));
        roundtrip(&ty("int256"), ParameterValue::int(I256::MINUS_ONE));
        roundtrip(&ty("bytes4"), ParameterValue::fixed_bytes(vec![1, 2, 3, 4]));
        roundtrip(&ty("bytes"), ParameterValue::bytes(vec![7u8; 45]));
        roundtrip(&ty("string"), ParameterValue::string(""));
        roundtrip(&ty("string"), ParameterValue::string("héllo wörld"));
    }

    #[test]
    fn roundtrips_composites() {
        let inner = TypeDescriptor::Tuple(vec![
            Param::new("id", ty("uint256")),
            Param::new("label", ty("string")),
        ]);
        let outer = TypeDescriptor::Tuple(vec![
            Param::new("owner", ty("address")),
            Param::new("items", TypeDescriptor::dynamic_array(inner)),
            Param::new("flags", ty("bool[2]")),
        ]);
        let item = |id: u64, label: &str| {
            ParameterValue::Struct(vec![
                ("id".into(), ParameterValue::uint(U256::from(id))),
                ("label".into(), ParameterValue::string(label)),
            ])
        };
        let value = ParameterValue::Struct(vec![
            ("owner".into(), ParameterValue::address(Address::repeat_byte(3))),
            ("items".into(), ParameterValue::List(vec![item(1, "a"), item(2, "bb")])),
            (
                "flags".into(),
                ParameterValue::List(vec![ParameterValue::bool(true), ParameterValue::bool(false)]),
            ),
        ]);
        roundtrip(&outer, value);

        roundtrip(
            &ty("uint256[2][]"),
            ParameterValue::List(vec![
                ParameterValue::List(vec![ParameterValue::uint(U256::from(1u64)), ParameterValue::uint(U256::from(2u64))]),
                ParameterValue::List(vec![ParameterValue::uint(U256::from(3u64)), ParameterValue::uint(U256::from(4u64))]),
            ]),
        );
        roundtrip(
            &ty("string[2]"),
            ParameterValue::List(vec![ParameterValue::string("x"), ParameterValue::string("yz")]),
        );
        roundtrip(&ty("address[]"), ParameterValue::List(vec![]));
    }

    #[test]
    fn decode_sequence_reports_next_offset() {
        let types = [ty("uint256"), ty("bytes"), ty("(uint256,uint256)")];
        let values = [
            ParameterValue::uint(U256::from(5u64)),
            ParameterValue::bytes(vec![1, 2, 3]),
            ParameterValue::Struct(vec![
                ("arg0".into(), ParameterValue::uint(U256::from(6u64))),
                ("arg1".into(), ParameterValue::uint(U256::from(7u64))),
            ]),
        ];
        let data = encode_params(&types, &values).unwrap();
        let mut offset = 0;
        for (t, expected) in types.iter().zip(&values) {
            let (v, next) = decode(t, &data, offset).unwrap();
            assert_eq!(&v, expected);
            offset = next;
        }
        assert_eq!(offset, 32 + 32 + 64);
        assert_eq!(decode_params(&types, &data).unwrap(), values.to_vec());
    }

    #[test]
    fn rejects_out_of_range_integers() {
        let err = encode(&ty("uint8"), &ParameterValue::uint(U256::from(256u64))).unwrap_err();
        assert!(matches!(err, AbiError::Encoding { .. }));
        let err = encode(&ty("int8"), &ParameterValue::int(I256::try_from(128i64).unwrap())).unwrap_err();
        assert!(matches!(err, AbiError::Encoding { .. }));
        assert!(encode(&ty("int8"), &ParameterValue::int(I256::try_from(-128i64).unwrap())).is_ok());
        assert!(encode(&ty("int8"), &ParameterValue::int(I256::try_from(-129i64).unwrap())).is_err());
    }

    #[test]
    fn rejects_shape_mismatches() {
        assert!(encode(&ty("uint256"), &ParameterValue::string("12")).is_err());
        assert!(encode(&ty("bytes4"), &ParameterValue::fixed_bytes(vec![1, 2])).is_err());
        assert!(encode(
            &ty("uint256[3]"),
            &ParameterValue::List(vec![ParameterValue::uint(U256::from(1u64))])
        )
        .is_err());
        assert!(encode_params(&[ty("bool")], &[]).is_err());
    }

    #[test]
    fn truncated_input_is_an_error() {
        let data = encode(&ty("uint256"), &ParameterValue::uint(U256::from(1u64))).unwrap();
        let err = decode(&ty("uint256"), &data[..31], 0).unwrap_err();
        assert!(matches!(err, AbiError::Decoding { .. }));

        let data = encode(&ty("string"), &ParameterValue::string("hello")).unwrap();
        assert!(decode(&ty("string"), &data[..66], 0).is_err());
    }

    #[test]
    fn offset_outside_buffer_is_an_error() {
        let mut data = encode(&ty("bytes"), &ParameterValue::bytes(vec![1])).unwrap();
        data[31] = 0xff;
        assert!(decode(&ty("bytes"), &data, 0).is_err());

        let mut data = vec![0u8; 32];
        data[0] = 1;
        assert!(decode(&ty("string"), &data, 0).is_err());
    }

    #[test]
    fn huge_array_length_is_rejected() {
        let mut data = vec![0u8; 64];
        data[31] = 0x20;
        data[56..].copy_from_slice(&u64::MAX.to_be_bytes());
        assert!(decode(&ty("uint256[]"), &data, 0).is_err());
    }

    fn word(n: usize) -> [u8; 32] {
        usize_word(n)
    }

    /// `uint256[][]` whose outer elements all point at one shared inner array.
    fn aliased_nested_array(outer: usize, inner: usize) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&word(0x20));
        data.extend_from_slice(&word(outer));
        for _ in 0..outer {
            data.extend_from_slice(&word(outer * 32));
        }
        data.extend_from_slice(&word(inner));
        for i in 0..inner {
            data.extend_from_slice(&word(i));
        }
        data
    }

    #[test]
    fn aliased_offsets_cannot_amplify_output() {
        let data = aliased_nested_array(200, 200);
        let err = decode_params(&[ty("uint256[][]")], &data).unwrap_err();
        assert!(matches!(err, AbiError::Decoding { .. }), "{err}");

        // A couple of shared references stay within budget.
        let small = aliased_nested_array(2, 3);
        let values = decode_params(&[ty("uint256[][]")], &small).unwrap();
        let ParameterValue::List(outer) = &values[0] else {
            panic!("expected list");
        };
        assert_eq!(outer.len(), 2);
        assert_eq!(outer[0], outer[1]);
    }

    #[test]
    fn aliased_byte_strings_are_charged_by_length() {
        // bytes[] with every element pointing at one 1 KiB blob.
        let outer = 64;
        let mut data = Vec::new();
        data.extend_from_slice(&word(0x20));
        data.extend_from_slice(&word(outer));
        for _ in 0..outer {
            data.extend_from_slice(&word(outer * 32));
        }
        data.extend_from_slice(&word(1024));
        data.extend(std::iter::repeat(0xab).take(1024));
        assert!(decode_params(&[ty("bytes[]")], &data).is_err());
    }

    #[test]
    fn large_well_formed_input_fits_budget() {
        let items: Vec<ParameterValue> = (0..500u64)
            .map(|i| {
                ParameterValue::List(vec![
                    ParameterValue::string(format!("item-{i}")),
                    ParameterValue::string(""),
                ])
            })
            .collect();
        let t = ty("string[2][]");
        let v = ParameterValue::List(items);
        let data = encode(&t, &v).unwrap();
        assert_eq!(decode(&t, &data, 0).unwrap().0, v);
    }

    #[test]
    fn dirty_words_are_rejected() {
        let mut word = [0u8; 32];
        word[0] = 1;
        assert!(decode(&ty("address"), &word, 0).is_err());
        assert!(decode(&ty("uint8"), &word, 0).is_err());
        let mut word = [0u8; 32];
        word[31] = 2;
        assert!(decode(&ty("bool"), &word, 0).is_err());
    }

    #[test]
    fn unnamed_components_get_positional_names() {
        let t = ty("(uint256,bool)");
        let data = encode_params(&[ty("uint256"), ty("bool")], &[ParameterValue::uint(U256::from(1u64)), ParameterValue::bool(false)])
            .unwrap();
        let (v, _) = decode(&t, &data, 0).unwrap();
        let ParameterValue::Struct(fields) = v else {
            panic!("expected struct");
        };
        assert_eq!(fields[0].0, "arg0");
        assert_eq!(fields[1].0, "arg1");
    }
}
