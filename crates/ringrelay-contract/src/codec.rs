//! Typed views over dynamic ABI values.
//!
//! Each bound method or event picks its own result type by implementing
//! [`DecodeOutput`] or [`EventDecode`]; callers never see untyped values
//! unless they ask for `Vec<DynSolValue>` / [`DecodedLog`] explicitly.

use alloy_core::dyn_abi::DynSolValue;
use alloy_primitives::{Address, B256, U256};

use crate::binding::DecodedLog;
use crate::error::ContractError;

/// Conversion from a method's decoded return values.
pub trait DecodeOutput: Sized {
    fn decode_output(values: Vec<DynSolValue>) -> Result<Self, ContractError>;
}

/// Conversion from a decoded log into an event's typed shape.
pub trait EventDecode: Sized + Send + 'static {
    fn decode_event(log: DecodedLog) -> Result<Self, ContractError>;
}

impl DecodeOutput for Vec<DynSolValue> {
    fn decode_output(values: Vec<DynSolValue>) -> Result<Self, ContractError> {
        Ok(values)
    }
}

impl DecodeOutput for () {
    fn decode_output(_: Vec<DynSolValue>) -> Result<Self, ContractError> {
        Ok(())
    }
}

impl DecodeOutput for U256 {
    fn decode_output(values: Vec<DynSolValue>) -> Result<Self, ContractError> {
        as_uint(&single(values)?)
    }
}

impl DecodeOutput for Address {
    fn decode_output(values: Vec<DynSolValue>) -> Result<Self, ContractError> {
        as_address(&single(values)?)
    }
}

impl DecodeOutput for bool {
    fn decode_output(values: Vec<DynSolValue>) -> Result<Self, ContractError> {
        as_bool(&single(values)?)
    }
}

impl DecodeOutput for B256 {
    fn decode_output(values: Vec<DynSolValue>) -> Result<Self, ContractError> {
        as_b256(&single(values)?)
    }
}

impl EventDecode for DecodedLog {
    fn decode_event(log: DecodedLog) -> Result<Self, ContractError> {
        Ok(log)
    }
}

// ─── Value accessors ─────────────────────────────────────────────────────────

/// Exactly one value, as returned by single-output methods.
pub fn single(values: Vec<DynSolValue>) -> Result<DynSolValue, ContractError> {
    let count = values.len();
    let mut iter = values.into_iter();
    match (iter.next(), count) {
        (Some(v), 1) => Ok(v),
        _ => Err(ContractError::decoding(format!("expected 1 output value, got {count}"))),
    }
}

pub fn as_uint(value: &DynSolValue) -> Result<U256, ContractError> {
    value
        .as_uint()
        .map(|(n, _)| n)
        .ok_or_else(|| mismatch("uint", value))
}

pub fn as_address(value: &DynSolValue) -> Result<Address, ContractError> {
    value.as_address().ok_or_else(|| mismatch("address", value))
}

pub fn as_bool(value: &DynSolValue) -> Result<bool, ContractError> {
    value.as_bool().ok_or_else(|| mismatch("bool", value))
}

pub fn as_b256(value: &DynSolValue) -> Result<B256, ContractError> {
    match value.as_fixed_bytes() {
        Some((bytes, 32)) => Ok(B256::from_slice(bytes)),
        _ => Err(mismatch("bytes32", value)),
    }
}

/// Elements of a dynamic (`T[]`) or fixed (`T[N]`) array.
pub fn as_list(value: &DynSolValue) -> Result<&[DynSolValue], ContractError> {
    value
        .as_array()
        .or_else(|| value.as_fixed_array())
        .ok_or_else(|| mismatch("array", value))
}

/// Named field of a decoded log, or a decoding error naming it.
pub fn field<'a>(log: &'a DecodedLog, name: &str) -> Result<&'a DynSolValue, ContractError> {
    log.field(name)
        .ok_or_else(|| ContractError::decoding(format!("{}: no field '{name}'", log.event)))
}

fn mismatch(expected: &str, value: &DynSolValue) -> ContractError {
    let found = value
        .sol_type_name()
        .map(|n| n.into_owned())
        .unwrap_or_else(|| "unknown".to_string());
    ContractError::decoding(format!("expected {expected}, found {found}"))
}
