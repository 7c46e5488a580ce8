//! Event log decoding.
//!
//! `topics[0]` identifies the event. Each indexed parameter occupies one of
//! the following topics; non-indexed parameters are encoded, in declaration
//! order, as a parameter list in the data blob. Indexed strings, bytes,
//! tuples and arrays are stored as the keccak hash of their encoding, so
//! only that hash can be reported.

use crate::codec::{self, component_name};
use alloy_primitives::B256;
use chainbroker_core::{AbiError, DecodedEvent, EventArgument, EventDescriptor, RawLog};

pub fn match_event<'a>(
    topic0: &B256,
    candidates: &'a [EventDescriptor],
) -> Option<&'a EventDescriptor> {
    candidates.iter().find(|e| &e.topic == topic0)
}

/// Decodes one log against `descriptor`.
pub fn decode_log(log: &RawLog, descriptor: &EventDescriptor) -> Result<DecodedEvent, AbiError> {
    let expected_topics = 1 + descriptor.indexed_count();
    if log.topics.len() != expected_topics {
        return Err(AbiError::decoding(format!(
            "{} expects {expected_topics} topics, log has {}",
            descriptor.signature,
            log.topics.len()
        )));
    }
    if log.topics[0] != descriptor.topic {
        return Err(AbiError::decoding(format!(
            "topic0 does not match {}",
            descriptor.signature
        )));
    }

    let data_types: Vec<_> = descriptor
        .params
        .iter()
        .filter(|p| !p.indexed)
        .map(|p| p.ty.clone())
        .collect();
    let mut data_values = codec::decode_params(&data_types, &log.data)?.into_iter();
    let mut topics = log.topics[1..].iter();

    let mut arguments = Vec::with_capacity(descriptor.params.len());
    for (i, param) in descriptor.params.iter().enumerate() {
        let name = component_name(&param.name, i);
        let argument = if param.indexed {
            let topic = topics
                .next()
                .ok_or_else(|| AbiError::decoding("ran out of topics"))?;
            if param.ty.is_hashed_when_indexed() {
                EventArgument::hash(name, *topic)
            } else {
                let (value, _) = codec::decode(&param.ty, topic.as_slice(), 0)?;
                EventArgument::value(name, value)
            }
        } else {
            let value = data_values
                .next()
                .ok_or_else(|| AbiError::decoding("ran out of data values"))?;
            EventArgument::value(name, value)
        };
        arguments.push(argument);
    }

    Ok(DecodedEvent {
        name: descriptor.name.clone(),
        signature: descriptor.signature.clone(),
        address: log.address,
        log_index: log.log_index,
        arguments,
    })
}

/// Decodes every log matching one of `candidates`.
///
/// Logs whose topic0 matches nothing are dropped. Events sharing a topic0
/// but indexed differently (ERC-20 and ERC-721 `Transfer`) are tried in
/// order until one decodes. A log that matches but decodes under none of
/// them is dropped with a warning rather than failing the batch.
pub fn decode_logs(logs: &[RawLog], candidates: &[EventDescriptor]) -> Vec<DecodedEvent> {
    logs.iter().filter_map(|log| decode_any(log, candidates)).collect()
}

fn decode_any(log: &RawLog, candidates: &[EventDescriptor]) -> Option<DecodedEvent> {
    let topic0 = log.topic0()?;
    let mut last_error = None;
    for descriptor in candidates.iter().filter(|e| &e.topic == topic0) {
        match decode_log(log, descriptor) {
            Ok(event) => return Some(event),
            Err(e) => last_error = Some((descriptor, e)),
        }
    }
    if let Some((descriptor, e)) = last_error {
        tracing::warn!(
            event = %descriptor.signature,
            address = %log.address,
            error = %e,
            "skipping undecodable log"
        );
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, Bytes, U256};
    use chainbroker_core::{ArgumentKind, EventParam, ParameterValue, TypeDescriptor};

    fn transfer_event() -> EventDescriptor {
        EventDescriptor::new(
            "Transfer",
            vec![
                EventParam::new("from", TypeDescriptor::address(), true),
                EventParam::new("to", TypeDescriptor::address(), true),
                EventParam::new("value", TypeDescriptor::uint(256), false),
            ],
        )
    }

    fn address_topic(a: Address) -> B256 {
        a.into_word()
    }

    fn transfer_log(from: Address, to: Address, value: u64) -> RawLog {
        RawLog {
            address: Address::repeat_byte(0xee),
            topics: vec![transfer_event().topic, address_topic(from), address_topic(to)],
            data: Bytes::from(U256::from(value).to_be_bytes::<32>().to_vec()),
            log_index: Some(3),
        }
    }

    #[test]
    fn transfer_decodes_in_declaration_order() {
        let from = Address::repeat_byte(0x01);
        let to = Address::repeat_byte(0x02);
        let event = decode_log(&transfer_log(from, to, 10), &transfer_event()).unwrap();

        assert_eq!(event.signature, "Transfer(address,address,uint256)");
        assert_eq!(event.log_index, Some(3));
        let names: Vec<_> = event.arguments.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["from", "to", "value"]);
        assert!(event.arguments.iter().all(|a| a.kind == ArgumentKind::Value));
        assert_eq!(event.arguments[0].value, Some(ParameterValue::address(from)));
        assert_eq!(event.arguments[1].value, Some(ParameterValue::address(to)));
        assert_eq!(
            event.arguments[2].value.as_ref().map(|v| v.to_string()),
            Some("10".to_string())
        );
    }

    #[test]
    fn indexed_dynamic_params_are_hashes() {
        let descriptor = EventDescriptor::new(
            "Named",
            vec![
                EventParam::new("label", "string".parse().unwrap(), true),
                EventParam::new("ids", "uint256[]".parse().unwrap(), true),
                EventParam::new("who", TypeDescriptor::address(), true),
            ],
        );
        let label_hash = chainbroker_core::signature::keccak256(b"alice");
        let log = RawLog {
            address: Address::ZERO,
            topics: vec![
                descriptor.topic,
                label_hash,
                B256::repeat_byte(7),
                address_topic(Address::repeat_byte(5)),
            ],
            data: Bytes::new(),
            log_index: None,
        };
        let event = decode_log(&log, &descriptor).unwrap();
        for arg in &event.arguments[..2] {
            assert_eq!(arg.kind, ArgumentKind::Hash);
            assert!(arg.value.is_none());
            assert!(arg.hash.is_some());
        }
        assert_eq!(event.arguments[0].hash, Some(label_hash));
        assert_eq!(event.arguments[2].kind, ArgumentKind::Value);
        assert!(event.arguments[2].value.is_some());
    }

    #[test]
    fn wrong_topic_count_is_an_error() {
        let mut log = transfer_log(Address::ZERO, Address::ZERO, 1);
        log.topics.pop();
        assert!(decode_log(&log, &transfer_event()).is_err());
    }

    #[test]
    fn truncated_data_is_an_error() {
        let mut log = transfer_log(Address::ZERO, Address::ZERO, 1);
        log.data = Bytes::from(vec![0u8; 16]);
        assert!(decode_log(&log, &transfer_event()).is_err());
    }

    #[test]
    fn unmatched_logs_are_excluded() {
        let mut stranger = transfer_log(Address::ZERO, Address::ZERO, 1);
        stranger.topics[0] = B256::repeat_byte(0xab);
        let anonymous = RawLog {
            address: Address::ZERO,
            topics: vec![],
            data: Bytes::new(),
            log_index: None,
        };
        let logs = vec![
            transfer_log(Address::repeat_byte(1), Address::repeat_byte(2), 5),
            stranger,
            anonymous,
        ];
        let decoded = decode_logs(&logs, &[transfer_event()]);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].name, "Transfer");
    }

    #[test]
    fn shared_topic0_falls_through_to_matching_indexing() {
        let erc721_transfer = EventDescriptor::new(
            "Transfer",
            vec![
                EventParam::new("from", TypeDescriptor::address(), true),
                EventParam::new("to", TypeDescriptor::address(), true),
                EventParam::new("tokenId", TypeDescriptor::uint(256), true),
            ],
        );
        assert_eq!(erc721_transfer.topic, transfer_event().topic);

        let nft_log = RawLog {
            address: Address::repeat_byte(0x77),
            topics: vec![
                erc721_transfer.topic,
                address_topic(Address::repeat_byte(1)),
                address_topic(Address::repeat_byte(2)),
                B256::from(U256::from(42u64)),
            ],
            data: Bytes::new(),
            log_index: Some(1),
        };
        let token_log = transfer_log(Address::repeat_byte(1), Address::repeat_byte(2), 5);

        let candidates = [transfer_event(), erc721_transfer];
        let decoded = decode_logs(&[token_log, nft_log], &candidates);
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].arguments[2].name, "value");
        assert_eq!(decoded[1].arguments[2].name, "tokenId");
        assert_eq!(
            decoded[1].arguments[2].value,
            Some(ParameterValue::uint(U256::from(42u64)))
        );
    }
}
