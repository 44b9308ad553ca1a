//! Bind-time descriptor table.
//!
//! The ABI document is read once and every function and event becomes an
//! immutable descriptor keyed by name and by full signature. Overloads share a
//! name; the first one in ABI order owns the bare name and the rest are
//! reachable only by signature.

use std::collections::HashMap;
use std::sync::Arc;

use alloy_core::dyn_abi::{DynSolType, DynSolValue};
use alloy_dyn_abi::{EventExt, FunctionExt, JsonAbiExt, Specifier};
use alloy_json_abi::{Event, Function, JsonAbi, StateMutability};
use alloy_primitives::{Address, Bytes, Selector, B256};

use ringrelay_rpc::Log;

use crate::error::{BindError, ContractError};

// ─── Methods ──────────────────────────────────────────────────────────────────

/// One callable function of the bound interface.
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    function: Function,
    signature: String,
    selector: Selector,
    input_types: Vec<DynSolType>,
}

impl MethodDescriptor {
    fn new(function: Function) -> Result<Self, BindError> {
        let signature = function.signature();
        let input_types = function
            .inputs
            .iter()
            .map(|p| p.resolve())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| BindError::UnresolvableType { item: signature.clone(), reason: e.to_string() })?;
        Ok(Self { selector: function.selector(), signature, input_types, function })
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }

    /// Canonical signature, e.g. `transfer(address,uint256)`.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// First four bytes of `keccak256(signature)`.
    pub fn selector(&self) -> Selector {
        self.selector
    }

    /// `true` for `view` and `pure` functions.
    pub fn is_constant(&self) -> bool {
        matches!(self.function.state_mutability, StateMutability::View | StateMutability::Pure)
    }

    pub fn input_types(&self) -> &[DynSolType] {
        &self.input_types
    }

    /// Pack `selector ++ abi_encode(args)` after checking arity and types.
    pub fn encode_input(&self, args: &[DynSolValue]) -> Result<Bytes, ContractError> {
        if args.len() != self.input_types.len() {
            return Err(ContractError::encoding(format!(
                "{}: expected {} arguments, got {}",
                self.signature,
                self.input_types.len(),
                args.len()
            )));
        }
        for (i, (ty, value)) in self.input_types.iter().zip(args).enumerate() {
            if !ty.matches(value) {
                return Err(ContractError::encoding(format!(
                    "{}: argument {i} is not a {}",
                    self.signature,
                    ty.sol_type_name()
                )));
            }
        }
        self.function
            .abi_encode_input(args)
            .map(Bytes::from)
            .map_err(|e| ContractError::encoding(format!("{}: {e}", self.signature)))
    }

    /// Unpack raw return data into the declared output values.
    pub fn decode_output(&self, data: &[u8]) -> Result<Vec<DynSolValue>, ContractError> {
        self.function
            .abi_decode_output(data, true)
            .map_err(|e| ContractError::decoding(format!("{} output: {e}", self.signature)))
    }
}

// ─── Events ───────────────────────────────────────────────────────────────────

/// One event of the bound interface.
#[derive(Debug, Clone)]
pub struct EventDescriptor {
    event: Event,
    signature: String,
    topic0: B256,
}

impl EventDescriptor {
    fn new(event: Event) -> Result<Self, BindError> {
        let signature = event.signature();
        for p in &event.inputs {
            p.resolve().map_err(|e| BindError::UnresolvableType {
                item: signature.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(Self { topic0: event.selector(), signature, event })
    }

    pub fn name(&self) -> &str {
        &self.event.name
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// `keccak256(signature)`, the first topic of every non-anonymous log.
    pub fn topic0(&self) -> B256 {
        self.topic0
    }

    pub fn is_anonymous(&self) -> bool {
        self.event.anonymous
    }

    /// Decode a log into named fields, in declaration order, merging the
    /// indexed topics with the data section.
    ///
    /// Indexed reference types (strings, arrays) come back as their 32-byte
    /// topic hash.
    pub fn decode_log(&self, log: &Log) -> Result<DecodedLog, ContractError> {
        let decoded = self
            .event
            .decode_log_parts(log.topics.iter().copied(), &log.data, true)
            .map_err(|e| ContractError::decoding(format!("{}: {e}", self.signature)))?;

        let mut indexed = decoded.indexed.into_iter();
        let mut body = decoded.body.into_iter();
        let mut fields = Vec::with_capacity(self.event.inputs.len());
        for input in &self.event.inputs {
            let value = if input.indexed { indexed.next() } else { body.next() };
            let value = value.ok_or_else(|| {
                ContractError::decoding(format!("{}: missing value for '{}'", self.signature, input.name))
            })?;
            fields.push((input.name.clone(), value));
        }

        Ok(DecodedLog {
            event: self.event.name.clone(),
            address: log.address,
            fields,
            block_number: log.block_number.map(|n| n.to::<u64>()),
            block_hash: log.block_hash,
            transaction_hash: log.transaction_hash,
            log_index: log.log_index.map(|n| n.to::<u64>()),
            removed: log.removed,
        })
    }
}

/// A log decoded against its event descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedLog {
    pub event: String,
    pub address: Address,
    /// `(parameter name, value)` in declaration order.
    pub fields: Vec<(String, DynSolValue)>,
    pub block_number: Option<u64>,
    pub block_hash: Option<B256>,
    pub transaction_hash: Option<B256>,
    pub log_index: Option<u64>,
    pub removed: bool,
}

impl DecodedLog {
    /// Look up a field by parameter name.
    pub fn field(&self, name: &str) -> Option<&DynSolValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

// ─── Table ────────────────────────────────────────────────────────────────────

/// Immutable descriptor table for one interface document.
#[derive(Debug, Clone, Default)]
pub struct ContractAbi {
    methods: HashMap<String, Arc<MethodDescriptor>>,
    events: HashMap<String, Arc<EventDescriptor>>,
}

impl ContractAbi {
    /// Parse a standard JSON ABI and register every function and event.
    pub fn from_json(abi_json: &str) -> Result<Self, BindError> {
        let abi: JsonAbi = serde_json::from_str(abi_json)
            .map_err(|e| BindError::InvalidAbi { reason: e.to_string() })?;
        Self::from_abi(&abi)
    }

    pub fn from_abi(abi: &JsonAbi) -> Result<Self, BindError> {
        let mut table = Self::default();

        for function in abi.functions() {
            let desc = Arc::new(MethodDescriptor::new(function.clone())?);
            tracing::debug!(
                method = %desc.signature(),
                selector = %desc.selector(),
                "bound contract method"
            );
            table.methods.entry(desc.name().to_string()).or_insert_with(|| desc.clone());
            table.methods.insert(desc.signature().to_string(), desc);
        }

        for event in abi.events() {
            let desc = Arc::new(EventDescriptor::new(event.clone())?);
            tracing::debug!(event = %desc.signature(), topic = %desc.topic0(), "bound contract event");
            table.events.entry(desc.name().to_string()).or_insert_with(|| desc.clone());
            table.events.insert(desc.signature().to_string(), desc);
        }

        Ok(table)
    }

    /// Method by name or signature; [`BindError::MissingMethod`] if absent.
    pub fn method(&self, key: &str) -> Result<Arc<MethodDescriptor>, BindError> {
        self.methods
            .get(key)
            .cloned()
            .ok_or_else(|| BindError::MissingMethod { name: key.to_string() })
    }

    /// Event by name or signature; [`BindError::MissingEvent`] if absent.
    pub fn event(&self, key: &str) -> Result<Arc<EventDescriptor>, BindError> {
        self.events
            .get(key)
            .cloned()
            .ok_or_else(|| BindError::MissingEvent { name: key.to_string() })
    }

    /// Distinct method signatures, sorted.
    pub fn method_signatures(&self) -> Vec<&str> {
        let mut sigs: Vec<&str> = self.methods.values().map(|m| m.signature()).collect();
        sigs.sort_unstable();
        sigs.dedup();
        sigs
    }

    /// Distinct event signatures, sorted.
    pub fn event_signatures(&self) -> Vec<&str> {
        let mut sigs: Vec<&str> = self.events.values().map(|e| e.signature()).collect();
        sigs.sort_unstable();
        sigs.dedup();
        sigs
    }
}
