//! Legacy transaction encoding with EIP-155 replay protection.

use alloy_primitives::{Address, Bytes, B256, U256};
use rlp::RlpStream;

use ringrelay_core::crypto::{self, VrsSignature};
use ringrelay_core::{Signer, SigningError};

/// A pre-EIP-2718 transaction bound to `chain_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: U256,
    pub gas_price: U256,
    pub gas: U256,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub chain_id: u64,
}

impl LegacyTransaction {
    fn append_body(&self, stream: &mut RlpStream) {
        append_uint(stream, self.nonce);
        append_uint(stream, self.gas_price);
        append_uint(stream, self.gas);
        stream.append(&self.to.to_vec());
        append_uint(stream, self.value);
        stream.append(&self.data.to_vec());
    }

    /// `keccak256(rlp([nonce, gasPrice, gas, to, value, data, chainId, 0, 0]))`.
    pub fn signing_hash(&self) -> B256 {
        let mut stream = RlpStream::new_list(9);
        self.append_body(&mut stream);
        stream.append(&self.chain_id);
        stream.append(&0u8);
        stream.append(&0u8);
        crypto::keccak256(&stream.out())
    }

    /// EIP-155 `v`: `recovery_id + 35 + 2 * chain_id`.
    pub fn eip155_v(&self, sig: &VrsSignature) -> Result<u64, SigningError> {
        let recid = sig.recovery_id().ok_or(SigningError::InvalidSignature { v: sig.v })?;
        Ok(recid as u64 + 35 + 2 * self.chain_id)
    }

    /// Raw signed transaction bytes for `eth_sendRawTransaction`.
    pub fn encode_signed(&self, sig: &VrsSignature) -> Result<Bytes, SigningError> {
        let v = self.eip155_v(sig)?;
        let mut stream = RlpStream::new_list(9);
        self.append_body(&mut stream);
        stream.append(&v);
        append_uint(&mut stream, U256::from_be_bytes(sig.r.0));
        append_uint(&mut stream, U256::from_be_bytes(sig.s.0));
        Ok(Bytes::from(stream.out().to_vec()))
    }

    /// Sign with `from`'s key and return the raw encoding.
    pub fn sign(&self, signer: &dyn Signer, from: &Address) -> Result<Bytes, SigningError> {
        let sig = signer.sign_digest(from, &self.signing_hash())?;
        self.encode_signed(&sig)
    }
}

/// RLP integers are big-endian with leading zeros stripped; zero is the empty string.
fn append_uint(stream: &mut RlpStream, value: U256) {
    let bytes = value.to_be_bytes::<32>();
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    stream.append(&bytes[start..].to_vec());
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;
    use ringrelay_core::Keystore;

    // EIP-155 reference example
    fn eip155_example() -> LegacyTransaction {
        LegacyTransaction {
            nonce: U256::from(9u64),
            gas_price: U256::from(20_000_000_000u64),
            gas: U256::from(21_000u64),
            to: Address::repeat_byte(0x35),
            value: U256::from(1_000_000_000_000_000_000u64),
            data: Bytes::new(),
            chain_id: 1,
        }
    }

    #[test]
    fn eip155_signing_hash_matches_reference() {
        assert_eq!(
            hex::encode(eip155_example().signing_hash()),
            "daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
        );
    }

    #[test]
    fn signed_encoding_recovers_sender() {
        let mut ks = Keystore::new();
        let from = ks.insert(SigningKey::from_slice(&[0x46; 32]).unwrap());
        assert_eq!(
            from,
            "0x9d8A62f656a8d1615C1294fd71e9CFb3E4855A4F".parse::<Address>().unwrap()
        );

        let tx = eip155_example();
        let sig = ks.sign_digest(&from, &tx.signing_hash()).unwrap();
        assert!(matches!(tx.eip155_v(&sig).unwrap(), 37 | 38));
        assert_eq!(crypto::recover_digest_signer(&tx.signing_hash(), &sig).unwrap(), from);

        let raw = tx.sign(&ks, &from).unwrap();
        // 0xf8 list prefix: payload longer than 55 bytes
        assert_eq!(raw[0], 0xf8);
    }

    #[test]
    fn uint_encoding_strips_leading_zeros() {
        let mut s = RlpStream::new();
        append_uint(&mut s, U256::ZERO);
        assert_eq!(s.out().to_vec(), vec![0x80]);

        let mut s = RlpStream::new();
        append_uint(&mut s, U256::from(0x0400u64));
        assert_eq!(s.out().to_vec(), vec![0x82, 0x04, 0x00]);
    }
}
