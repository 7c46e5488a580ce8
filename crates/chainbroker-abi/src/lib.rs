//! # chainbroker-abi
//!
//! Encoding and decoding against contract descriptors: the head/tail
//! parameter codec, function selector resolution with an explicit
//! provisional fallback, event log decoding, and ABI JSON loading.

pub mod abi_json;
pub mod codec;
pub mod event;
pub mod function;
pub mod json;

pub use abi_json::contract_from_abi_json;
pub use codec::{decode, decode_params, encode, encode_params};
pub use event::{decode_log, decode_logs, match_event};
pub use function::{
    decode_call, decode_call_lenient, decode_call_strict, decode_constructor_args, decode_output,
    encode_call, match_function, split_words, ConstructorArguments,
};
