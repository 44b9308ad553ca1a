//! Wire form of an order as submitted to the gateway.
//!
//! Addresses and hashes arrive as hex text, so their byte lengths are only
//! known after decoding. A wrong length is a structural rejection.

use std::str::FromStr;

use alloy_primitives::{Address, B256, U256};
use ringrelay_core::Order;
use serde::{Deserialize, Serialize};

use crate::error::Rejection;

const ADDRESS_LENGTH: usize = 20;
const HASH_LENGTH: usize = 32;

/// A signed order as received from a client or peer.
///
/// Integer fields accept decimal text or `0x` hex.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub protocol: String,
    pub owner: String,
    pub token_s: String,
    pub token_b: String,
    pub amount_s: String,
    pub amount_b: String,
    pub timestamp: String,
    pub ttl: String,
    pub salt: String,
    pub fee_amount: String,
    #[serde(default)]
    pub buy_no_more_than_amount_b: bool,
    #[serde(default)]
    pub margin_split_percentage: u8,
    pub v: u8,
    pub r: String,
    pub s: String,
    /// Client-computed hash. Checked for shape only; the gateway recomputes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl OrderRequest {
    /// Decode into a typed [`Order`], rejecting malformed fields.
    pub fn decode(&self) -> Result<Order, Rejection> {
        if let Some(hash) = &self.hash {
            fixed_bytes::<HASH_LENGTH>("hash", hash)?;
        }
        Ok(Order {
            protocol: address("protocol", &self.protocol)?,
            owner: address("owner", &self.owner)?,
            token_s: address("tokenS", &self.token_s)?,
            token_b: address("tokenB", &self.token_b)?,
            amount_s: uint("amountS", &self.amount_s)?,
            amount_b: uint("amountB", &self.amount_b)?,
            timestamp: uint("timestamp", &self.timestamp)?,
            ttl: uint("ttl", &self.ttl)?,
            salt: uint("salt", &self.salt)?,
            fee_amount: uint("feeAmount", &self.fee_amount)?,
            buy_no_more_than_amount_b: self.buy_no_more_than_amount_b,
            margin_split_percentage: self.margin_split_percentage,
            v: self.v,
            r: B256::from(fixed_bytes::<HASH_LENGTH>("r", &self.r)?),
            s: B256::from(fixed_bytes::<HASH_LENGTH>("s", &self.s)?),
            hash: B256::ZERO,
        })
    }
}

impl From<&Order> for OrderRequest {
    fn from(order: &Order) -> Self {
        Self {
            protocol: order.protocol.to_string(),
            owner: order.owner.to_string(),
            token_s: order.token_s.to_string(),
            token_b: order.token_b.to_string(),
            amount_s: order.amount_s.to_string(),
            amount_b: order.amount_b.to_string(),
            timestamp: order.timestamp.to_string(),
            ttl: order.ttl.to_string(),
            salt: order.salt.to_string(),
            fee_amount: order.fee_amount.to_string(),
            buy_no_more_than_amount_b: order.buy_no_more_than_amount_b,
            margin_split_percentage: order.margin_split_percentage,
            v: order.v,
            r: order.r.to_string(),
            s: order.s.to_string(),
            hash: (!order.hash.is_zero()).then(|| order.hash.to_string()),
        }
    }
}

fn fixed_bytes<const N: usize>(field: &'static str, text: &str) -> Result<[u8; N], Rejection> {
    let raw = text.strip_prefix("0x").unwrap_or(text);
    let bytes = hex::decode(raw).map_err(|e| Rejection::Malformed { field, reason: e.to_string() })?;
    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| Rejection::Malformed {
        field,
        reason: format!("expected {N} bytes, got {}", bytes.len()),
    })
}

fn address(field: &'static str, text: &str) -> Result<Address, Rejection> {
    fixed_bytes::<ADDRESS_LENGTH>(field, text).map(Address::from)
}

fn uint(field: &'static str, text: &str) -> Result<U256, Rejection> {
    U256::from_str(text.trim()).map_err(|e| Rejection::Malformed { field, reason: e.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> OrderRequest {
        OrderRequest {
            protocol: format!("0x{}", "ee".repeat(20)),
            owner: format!("0x{}", "01".repeat(20)),
            token_s: format!("0x{}", "a0".repeat(20)),
            token_b: format!("0x{}", "b0".repeat(20)),
            amount_s: "1000".into(),
            amount_b: "0x7d0".into(),
            timestamp: "1510000000".into(),
            ttl: "3600".into(),
            salt: "7".into(),
            fee_amount: "5".into(),
            v: 27,
            r: format!("0x{}", "11".repeat(32)),
            s: format!("0x{}", "22".repeat(32)),
            ..Default::default()
        }
    }

    #[test]
    fn decodes_decimal_and_hex_integers() {
        let order = request().decode().unwrap();
        assert_eq!(order.amount_s, U256::from(1000u64));
        assert_eq!(order.amount_b, U256::from(2000u64));
        assert_eq!(order.token_s, Address::repeat_byte(0xa0));
    }

    #[test]
    fn short_address_is_malformed() {
        let mut req = request();
        req.token_b = format!("0x{}", "b0".repeat(19));
        let err = req.decode().unwrap_err();
        assert_eq!(
            err,
            Rejection::Malformed { field: "tokenB", reason: "expected 20 bytes, got 19".into() }
        );
        assert_eq!(err.filter(), "structural");
    }

    #[test]
    fn long_hash_is_malformed() {
        let mut req = request();
        req.hash = Some(format!("0x{}", "33".repeat(33)));
        assert!(matches!(req.decode(), Err(Rejection::Malformed { field: "hash", .. })));
    }

    #[test]
    fn order_round_trips_through_wire_form() {
        let order = request().decode().unwrap();
        let back = OrderRequest::from(&order).decode().unwrap();
        assert_eq!(back, order);
    }
}
