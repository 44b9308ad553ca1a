//! secp256k1 signing, recovery, and keccak256 hashing.
//!
//! Orders and rings are signed in the personal-message form: the 32-byte
//! hash is prefixed with `"\x19Ethereum Signed Message:\n32"` and hashed
//! again before signing, which is what the on-chain protocol `ecrecover`s.
//! Transactions are signed over the raw digest instead ([`Signer::sign_digest`]).

use std::collections::HashMap;

use alloy_primitives::{Address, B256};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use tiny_keccak::{Hasher, Keccak};

use crate::error::SigningError;

/// secp256k1 curve order n, big-endian.
const SECP256K1_ORDER: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE,
    0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41, 0x41,
];

const MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// keccak256 of a byte slice.
pub fn keccak256(data: &[u8]) -> B256 {
    keccak256_concat(&[data])
}

/// keccak256 over the concatenation of `parts`, without allocating.
pub fn keccak256_concat(parts: &[&[u8]]) -> B256 {
    let mut hasher = Keccak::v256();
    for part in parts {
        hasher.update(part);
    }
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    B256::from(output)
}

/// The digest actually signed for an order or ring hash.
pub fn message_digest(hash: &B256) -> B256 {
    keccak256_concat(&[MESSAGE_PREFIX, hash.as_slice()])
}

/// An Ethereum-style `(v, r, s)` signature with `v ∈ {27, 28}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VrsSignature {
    pub v: u8,
    pub r: B256,
    pub s: B256,
}

impl VrsSignature {
    /// Normalised recovery id (0 or 1), accepting both the `27/28` and `0/1` forms.
    pub fn recovery_id(&self) -> Option<u8> {
        match self.v {
            27 | 28 => Some(self.v - 27),
            0 | 1 => Some(self.v),
            _ => None,
        }
    }

    /// Pure range check: `r` and `s` in `[1, n-1]`, `v` a valid recovery id.
    pub fn has_valid_values(&self) -> bool {
        validate_signature_values(self.v, &self.r, &self.s)
    }
}

/// Range-checks raw signature components without recovering a key.
pub fn validate_signature_values(v: u8, r: &B256, s: &B256) -> bool {
    let in_range = |x: &B256| !x.is_zero() && x.0 < SECP256K1_ORDER;
    matches!(v, 0 | 1 | 27 | 28) && in_range(r) && in_range(s)
}

/// Ethereum address of a secp256k1 public key.
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    // Skip the 0x04 uncompressed-point tag
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

/// Sign a raw 32-byte digest. `v` is returned in the `27/28` form.
pub fn sign_digest(key: &SigningKey, digest: &B256) -> Result<VrsSignature, SigningError> {
    let (sig, recid) = key
        .sign_prehash_recoverable(digest.as_slice())
        .map_err(|e| SigningError::Failed { reason: e.to_string() })?;
    let bytes = sig.to_bytes();
    Ok(VrsSignature {
        v: recid.to_byte() + 27,
        r: B256::from_slice(&bytes[..32]),
        s: B256::from_slice(&bytes[32..]),
    })
}

/// Sign an order/ring hash in personal-message form.
pub fn sign_hash(key: &SigningKey, hash: &B256) -> Result<VrsSignature, SigningError> {
    sign_digest(key, &message_digest(hash))
}

/// Recover the signer of a raw digest.
pub fn recover_digest_signer(digest: &B256, sig: &VrsSignature) -> Result<Address, SigningError> {
    let recid = sig
        .recovery_id()
        .and_then(RecoveryId::from_byte)
        .ok_or(SigningError::InvalidSignature { v: sig.v })?;

    let mut raw = [0u8; 64];
    raw[..32].copy_from_slice(sig.r.as_slice());
    raw[32..].copy_from_slice(sig.s.as_slice());
    let signature =
        Signature::from_slice(&raw).map_err(|_| SigningError::InvalidSignature { v: sig.v })?;

    // ecrecover accepts high-s; k256 only recovers from the low-s form,
    // whose point has the opposite y parity.
    let (signature, recid) = match signature.normalize_s() {
        Some(low) => (low, RecoveryId::new(!recid.is_y_odd(), recid.is_x_reduced())),
        None => (signature, recid),
    };

    let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &signature, recid)
        .map_err(|e| SigningError::Recovery { reason: e.to_string() })?;
    Ok(address_of(&key))
}

/// Recover the signer of an order/ring hash signed with [`sign_hash`].
pub fn recover_signer(hash: &B256, sig: &VrsSignature) -> Result<Address, SigningError> {
    recover_digest_signer(&message_digest(hash), sig)
}

// ─── Signer capability ────────────────────────────────────────────────────────

/// Signing capability supplied by the environment (keystore, HSM, remote signer).
pub trait Signer: Send + Sync {
    /// Accounts this signer can sign for, in the order they were added.
    fn accounts(&self) -> Vec<Address>;

    /// Returns `true` if this signer holds the key for `account`.
    fn has_account(&self, account: &Address) -> bool {
        self.accounts().contains(account)
    }

    /// Sign a raw digest with `account`'s key.
    fn sign_digest(&self, account: &Address, digest: &B256) -> Result<VrsSignature, SigningError>;

    /// Sign an order/ring hash (personal-message form) with `account`'s key.
    fn sign_hash(&self, account: &Address, hash: &B256) -> Result<VrsSignature, SigningError> {
        self.sign_digest(account, &message_digest(hash))
    }
}

/// In-process keystore of unlocked secp256k1 keys.
#[derive(Default)]
pub struct Keystore {
    keys: HashMap<Address, SigningKey>,
    order: Vec<Address>,
}

impl Keystore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an unlocked key and return its address.
    pub fn insert(&mut self, key: SigningKey) -> Address {
        let address = address_of(key.verifying_key());
        if self.keys.insert(address, key).is_none() {
            self.order.push(address);
        }
        address
    }

    /// Add a key from its 32-byte hex encoding (with or without `0x`).
    pub fn insert_hex(&mut self, secret: &str) -> Result<Address, SigningError> {
        let raw = hex::decode(secret.trim_start_matches("0x"))
            .map_err(|e| SigningError::InvalidKey { reason: e.to_string() })?;
        let key = SigningKey::from_slice(&raw)
            .map_err(|e| SigningError::InvalidKey { reason: e.to_string() })?;
        Ok(self.insert(key))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl std::fmt::Debug for Keystore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keystore").field("accounts", &self.accounts()).finish()
    }
}

impl Signer for Keystore {
    fn accounts(&self) -> Vec<Address> {
        self.order.clone()
    }

    fn has_account(&self, account: &Address) -> bool {
        self.keys.contains_key(account)
    }

    fn sign_digest(&self, account: &Address, digest: &B256) -> Result<VrsSignature, SigningError> {
        let key = self
            .keys
            .get(account)
            .ok_or(SigningError::UnknownAccount { address: *account })?;
        sign_digest(key, digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> SigningKey {
        SigningKey::from_slice(&[byte; 32]).unwrap()
    }

    #[test]
    fn keccak_empty_input() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn sign_then_recover_returns_signer() {
        let key = key(0x11);
        let expected = address_of(key.verifying_key());
        for seed in [0u8, 1, 0x7f, 0xff] {
            let hash = keccak256(&[seed]);
            let sig = sign_hash(&key, &hash).unwrap();
            assert!(sig.v == 27 || sig.v == 28);
            assert!(sig.has_valid_values());
            assert_eq!(recover_signer(&hash, &sig).unwrap(), expected);
        }
    }

    #[test]
    fn recover_with_other_hash_yields_other_address() {
        let key = key(0x22);
        let sig = sign_hash(&key, &keccak256(b"a")).unwrap();
        let recovered = recover_signer(&keccak256(b"b"), &sig).unwrap();
        assert_ne!(recovered, address_of(key.verifying_key()));
    }

    #[test]
    fn high_s_form_recovers_same_signer() {
        use alloy_primitives::U256;

        let key = key(0x55);
        let hash = keccak256(b"order");
        let low = sign_hash(&key, &hash).unwrap();

        let n = U256::from_be_bytes(SECP256K1_ORDER);
        let high = VrsSignature {
            v: if low.v == 27 { 28 } else { 27 },
            r: low.r,
            s: B256::from((n - U256::from_be_bytes(low.s.0)).to_be_bytes::<32>()),
        };
        assert!(high.has_valid_values());
        assert_eq!(recover_signer(&hash, &high).unwrap(), address_of(key.verifying_key()));
    }

    #[test]
    fn keystore_lists_accounts_in_insertion_order() {
        let mut ks = Keystore::new();
        let first = ks.insert(key(0x66));
        let second = ks.insert(key(0x01));
        ks.insert(key(0x66));
        assert_eq!(ks.accounts(), vec![first, second]);
    }

    #[test]
    fn signature_value_ranges() {
        let one = B256::with_last_byte(1);
        assert!(validate_signature_values(27, &one, &one));
        assert!(validate_signature_values(1, &one, &one));
        assert!(!validate_signature_values(29, &one, &one));
        assert!(!validate_signature_values(27, &B256::ZERO, &one));
        assert!(!validate_signature_values(27, &one, &B256::from(SECP256K1_ORDER)));
    }

    #[test]
    fn keystore_rejects_unknown_account() {
        let mut ks = Keystore::new();
        let addr = ks.insert(key(0x33));
        assert!(ks.has_account(&addr));
        let err = ks.sign_hash(&Address::ZERO, &B256::ZERO).unwrap_err();
        assert!(err.is_unknown_account());
    }

    #[test]
    fn keystore_insert_hex() {
        let mut ks = Keystore::new();
        let a = ks.insert_hex(&format!("0x{}", "44".repeat(32))).unwrap();
        assert_eq!(a, address_of(key(0x44).verifying_key()));
        assert!(ks.insert_hex("0xnothex").is_err());
    }
}
