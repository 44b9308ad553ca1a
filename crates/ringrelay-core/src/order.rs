//! Signed orders and their match-time annotations.

use alloy_primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::{self, Signer, VrsSignature};
use crate::error::SigningError;

// ─── Order ────────────────────────────────────────────────────────────────────

/// An off-chain order signed by its owner.
///
/// `hash` is the canonical digest of the immutable fields (see
/// [`Order::generate_hash`]); `(v, r, s)` must recover to `owner`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Exchange (protocol) contract the order targets.
    pub protocol: Address,
    pub owner: Address,
    pub token_s: Address,
    pub token_b: Address,
    pub amount_s: U256,
    pub amount_b: U256,
    pub timestamp: U256,
    pub ttl: U256,
    pub salt: U256,
    /// Fee paid in the protocol fee token.
    pub fee_amount: U256,
    #[serde(default)]
    pub buy_no_more_than_amount_b: bool,
    #[serde(default)]
    pub margin_split_percentage: u8,
    pub v: u8,
    pub r: B256,
    pub s: B256,
    #[serde(default)]
    pub hash: B256,
}

impl Order {
    /// Canonical hash over the immutable fields, tightly packed:
    /// four addresses, six 32-byte big-endian integers, then two single bytes.
    pub fn generate_hash(&self) -> B256 {
        let amount_s = self.amount_s.to_be_bytes::<32>();
        let amount_b = self.amount_b.to_be_bytes::<32>();
        let timestamp = self.timestamp.to_be_bytes::<32>();
        let ttl = self.ttl.to_be_bytes::<32>();
        let salt = self.salt.to_be_bytes::<32>();
        let fee = self.fee_amount.to_be_bytes::<32>();
        crypto::keccak256_concat(&[
            self.protocol.as_slice(),
            self.owner.as_slice(),
            self.token_s.as_slice(),
            self.token_b.as_slice(),
            &amount_s,
            &amount_b,
            &timestamp,
            &ttl,
            &salt,
            &fee,
            &[self.buy_no_more_than_amount_b as u8],
            &[self.margin_split_percentage],
        ])
    }

    pub fn signature(&self) -> VrsSignature {
        VrsSignature { v: self.v, r: self.r, s: self.s }
    }

    /// Recompute the hash and recover the address that signed it.
    pub fn signer_address(&self) -> Result<Address, SigningError> {
        crypto::recover_signer(&self.generate_hash(), &self.signature())
    }

    /// Set `hash` and sign it with the owner's key.
    pub fn sign(&mut self, signer: &dyn Signer) -> Result<(), SigningError> {
        self.hash = self.generate_hash();
        let sig = signer.sign_hash(&self.owner, &self.hash)?;
        self.v = sig.v;
        self.r = sig.r;
        self.s = sig.s;
        Ok(())
    }
}

// ─── Match-time annotations ──────────────────────────────────────────────────

/// Miner's choice of compensation for one order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum FeeSelection {
    /// Take the order's fee in the protocol fee token.
    #[default]
    Fee = 0,
    /// Take a share of the price saving instead.
    SavingShare = 1,
}

impl From<FeeSelection> for u8 {
    fn from(sel: FeeSelection) -> u8 {
        sel as u8
    }
}

impl TryFrom<u8> for FeeSelection {
    type Error = String;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Self::Fee),
            1 => Ok(Self::SavingShare),
            other => Err(format!("unknown fee selection {other}")),
        }
    }
}

/// An order as placed into a ring by the matcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilledOrder {
    pub order: Order,
    #[serde(default)]
    pub fee_selection: FeeSelection,
    /// Sell amount after the ring's rate reduction, rounded to an integer.
    pub rate_amount_s: U256,
}

impl FilledOrder {
    pub fn new(order: Order, fee_selection: FeeSelection, rate_amount_s: U256) -> Self {
        Self { order, fee_selection, rate_amount_s }
    }
}

/// The record created for an order once admission accepts it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderState {
    pub order: Order,
    /// Number of successful broadcasts so far.
    pub broadcast_count: u32,
    pub created_at: DateTime<Utc>,
}

impl OrderState {
    pub fn new(order: Order) -> Self {
        Self { order, broadcast_count: 0, created_at: Utc::now() }
    }

    pub fn hash(&self) -> B256 {
        self.order.hash
    }
}
