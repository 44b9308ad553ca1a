//! The admission filter chain.

use std::collections::HashSet;

use alloy_primitives::{Address, U256};
use ringrelay_core::Order;

use crate::error::Rejection;

/// One stage of the admission chain.
///
/// `order.hash` has already been recomputed when a filter runs.
pub trait Filter: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, order: &Order) -> Result<(), Rejection>;
}

// ─── Structural ───────────────────────────────────────────────────────────────

/// Distinct sell/buy tokens and a fee strictly above the minimum.
///
/// Field lengths are enforced when the wire form is decoded
/// ([`OrderRequest::decode`](crate::OrderRequest::decode)).
#[derive(Debug, Clone)]
pub struct StructuralFilter {
    pub min_fee: U256,
}

impl Filter for StructuralFilter {
    fn name(&self) -> &'static str {
        "structural"
    }

    fn check(&self, order: &Order) -> Result<(), Rejection> {
        if order.token_s == order.token_b {
            return Err(Rejection::SameToken { token: order.token_s });
        }
        if order.fee_amount <= self.min_fee {
            return Err(Rejection::FeeTooLow { fee: order.fee_amount, min: self.min_fee });
        }
        Ok(())
    }
}

// ─── Signature ────────────────────────────────────────────────────────────────

/// The signature must recover to the order's owner.
#[derive(Debug, Clone, Default)]
pub struct SignatureFilter;

impl Filter for SignatureFilter {
    fn name(&self) -> &'static str {
        "signature"
    }

    fn check(&self, order: &Order) -> Result<(), Rejection> {
        let signer = order
            .signer_address()
            .map_err(|e| Rejection::BadSignature { reason: e.to_string() })?;
        if signer != order.owner {
            return Err(Rejection::SignerMismatch { owner: order.owner, signer });
        }
        Ok(())
    }
}

// ─── Token policy ─────────────────────────────────────────────────────────────

/// Sell-token policy. The allow set is consulted first, then the deny set,
/// so a token listed in both is rejected.
#[derive(Debug, Clone, Default)]
pub struct TokenFilter {
    allow: HashSet<Address>,
    deny: HashSet<Address>,
}

impl TokenFilter {
    pub fn new(
        allow: impl IntoIterator<Item = Address>,
        deny: impl IntoIterator<Item = Address>,
    ) -> Self {
        Self { allow: allow.into_iter().collect(), deny: deny.into_iter().collect() }
    }

    pub fn allow(&mut self, token: Address) {
        self.allow.insert(token);
    }

    pub fn deny(&mut self, token: Address) {
        self.deny.insert(token);
    }

    pub fn remove_allowed(&mut self, token: &Address) -> bool {
        self.allow.remove(token)
    }

    pub fn remove_denied(&mut self, token: &Address) -> bool {
        self.deny.remove(token)
    }
}

impl Filter for TokenFilter {
    fn name(&self) -> &'static str {
        "token"
    }

    fn check(&self, order: &Order) -> Result<(), Rejection> {
        if !self.allow.contains(&order.token_s) {
            return Err(Rejection::TokenNotAllowed { token: order.token_s });
        }
        if self.deny.contains(&order.token_s) {
            return Err(Rejection::TokenDenied { token: order.token_s });
        }
        Ok(())
    }
}
