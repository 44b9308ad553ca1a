//! Serde helpers for JSON-RPC "quantity" encoding (`0x`-prefixed hex).
//!
//! Node responses encode every integer as hex text. Deserialization also
//! accepts plain JSON numbers and decimal strings so that hand-written
//! fixtures and persisted records stay readable.

use serde::{de, Deserialize, Deserializer, Serializer};

/// Parse a quantity string: `0x`-prefixed hex, or decimal otherwise.
pub fn parse_u64(s: &str) -> Result<u64, String> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some("") => Ok(0),
        Some(hex) => u64::from_str_radix(hex, 16).map_err(|e| format!("invalid hex quantity '{s}': {e}")),
        None => s.parse::<u64>().map_err(|e| format!("invalid quantity '{s}': {e}")),
    }
}

/// Format a `u64` as a minimal `0x`-prefixed hex quantity.
pub fn format_u64(n: u64) -> String {
    format!("{n:#x}")
}

/// `#[serde(with = "quantity::u64_hex")]` for `u64` fields.
pub mod u64_hex {
    use super::*;

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_u64(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(u64),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Num(n) => Ok(n),
            Raw::Text(s) => parse_u64(&s).map_err(de::Error::custom),
        }
    }
}
