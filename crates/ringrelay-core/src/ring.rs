//! Ring composition: hashing, miner signature, and submit-argument flattening.
//!
//! A ring must contain at least one order. That is a caller precondition and is
//! not checked here; an empty ring folds to the all-zero identity and still
//! hashes deterministically.

use alloy_primitives::{Address, B256, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::crypto::{self, Signer, VrsSignature};
use crate::error::SigningError;
use crate::order::{FeeSelection, FilledOrder};

/// A matched order cycle ready to be signed by a miner and submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ring {
    pub orders: Vec<FilledOrder>,
    pub miner: Address,
    /// Price discount applied when the cycle closed.
    #[serde(default)]
    pub reduced_rate: Option<Decimal>,
    /// Fee estimate in fiat terms.
    #[serde(default)]
    pub legal_fee: Option<Decimal>,
    #[serde(default)]
    pub fee_mode: FeeSelection,
    #[serde(default)]
    hash: Option<B256>,
    #[serde(default)]
    signature: Option<VrsSignature>,
}

impl Ring {
    pub fn new(orders: Vec<FilledOrder>, miner: Address) -> Self {
        Self {
            orders,
            miner,
            reduced_rate: None,
            legal_fee: None,
            fee_mode: FeeSelection::Fee,
            hash: None,
            signature: None,
        }
    }

    /// XOR-fold every order's `v`, `r`, and `s`, then keccak256 the three folds.
    ///
    /// The fold is commutative, so any permutation of the same orders yields
    /// the same hash.
    pub fn generate_hash(&self) -> B256 {
        let mut v = 0u8;
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        for filled in &self.orders {
            let order = &filled.order;
            v ^= order.v;
            for (acc, byte) in r.iter_mut().zip(order.r.iter()) {
                *acc ^= byte;
            }
            for (acc, byte) in s.iter_mut().zip(order.s.iter()) {
                *acc ^= byte;
            }
        }
        crypto::keccak256_concat(&[&[v], &r, &s])
    }

    /// The ring hash, computed on first use and cached afterwards.
    pub fn compute_hash(&mut self) -> B256 {
        if let Some(hash) = self.hash {
            return hash;
        }
        let hash = self.generate_hash();
        self.hash = Some(hash);
        hash
    }

    pub fn hash(&self) -> Option<B256> {
        self.hash
    }

    pub fn signature(&self) -> Option<VrsSignature> {
        self.signature
    }

    /// Sign the ring hash with `miner`'s key and store the signature.
    pub fn sign(&mut self, signer: &dyn Signer, miner: &Address) -> Result<VrsSignature, SigningError> {
        let hash = self.compute_hash();
        let sig = signer.sign_hash(miner, &hash)?;
        self.signature = Some(sig);
        Ok(sig)
    }

    /// Range check of the stored signature. Does not check who signed.
    pub fn verify(&self) -> bool {
        self.signature.is_some_and(|sig| sig.has_valid_values())
    }

    /// Recover the address that signed the ring hash.
    pub fn recover_signer(&self) -> Result<Address, SigningError> {
        let sig = self.signature.ok_or(SigningError::Unsigned)?;
        let hash = self.hash.unwrap_or_else(|| self.generate_hash());
        crypto::recover_signer(&hash, &sig)
    }

    /// Flatten the ring into the column arrays of a `submitRing` call.
    ///
    /// Signs the ring with `miner` and appends its signature after the
    /// orders' own. A zero `fee_recipient` defaults to the recovered miner.
    pub fn build_submit_inputs(
        &mut self,
        signer: &dyn Signer,
        miner: &Address,
        fee_recipient: Address,
    ) -> Result<RingSubmitInputs, SigningError> {
        let mut inputs = RingSubmitInputs::with_capacity(self.orders.len());

        for filled in &self.orders {
            let order = &filled.order;
            inputs.address_list.push([order.owner, order.token_s]);
            inputs.uint_args_list.push([
                order.amount_s,
                order.amount_b,
                order.timestamp,
                order.ttl,
                order.salt,
                order.fee_amount,
                filled.rate_amount_s,
            ]);
            inputs
                .uint8_args_list
                .push([order.margin_split_percentage, filled.fee_selection.into()]);
            inputs.buy_no_more_than_amount_b_list.push(order.buy_no_more_than_amount_b);
            inputs.v_list.push(order.v);
            inputs.r_list.push(order.r);
            inputs.s_list.push(order.s);
        }

        let sig = self.sign(signer, miner)?;
        inputs.v_list.push(sig.v);
        inputs.r_list.push(sig.r);
        inputs.s_list.push(sig.s);

        let ringminer = self.recover_signer()?;
        inputs.ringminer = ringminer;
        inputs.fee_recipient = if fee_recipient.is_zero() { ringminer } else { fee_recipient };

        tracing::debug!(
            ring_hash = %self.compute_hash(),
            orders = self.orders.len(),
            %ringminer,
            "built ring submit inputs"
        );
        Ok(inputs)
    }
}

/// Column-oriented `submitRing` arguments derived from a signed ring.
///
/// `v_list`, `r_list` and `s_list` hold one entry per order plus the ring's
/// own signature last.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RingSubmitInputs {
    pub address_list: Vec<[Address; 2]>,
    pub uint_args_list: Vec<[U256; 7]>,
    pub uint8_args_list: Vec<[u8; 2]>,
    pub buy_no_more_than_amount_b_list: Vec<bool>,
    pub v_list: Vec<u8>,
    pub r_list: Vec<B256>,
    pub s_list: Vec<B256>,
    pub ringminer: Address,
    pub fee_recipient: Address,
    pub throw_if_lrc_is_insufficient: bool,
}

impl RingSubmitInputs {
    fn with_capacity(orders: usize) -> Self {
        Self {
            address_list: Vec::with_capacity(orders),
            uint_args_list: Vec::with_capacity(orders),
            uint8_args_list: Vec::with_capacity(orders),
            buy_no_more_than_amount_b_list: Vec::with_capacity(orders),
            v_list: Vec::with_capacity(orders + 1),
            r_list: Vec::with_capacity(orders + 1),
            s_list: Vec::with_capacity(orders + 1),
            ..Default::default()
        }
    }

    /// Number of orders in the ring these inputs were built from.
    pub fn order_count(&self) -> usize {
        self.address_list.len()
    }
}
