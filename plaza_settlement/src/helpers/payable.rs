//! # Payable references and preimage verification
//!
//! A payable reference is the string a buyer is asked to pay against, typically a Lightning
//! invoice. The reference format embeds a commitment to a payment secret: the SHA-256 hash of
//! the preimage that the payee must reveal to claim the payment. Whoever can produce a value
//! that hashes to that commitment has proven, at the protocol level, that the payment happened.
//!
//! Payment-request records deliver the commitment alongside the raw reference string as 64
//! hexadecimal characters, so the core never needs a decoder for the reference format itself.
//! A malformed commitment is a configuration error and is rejected when the reference is
//! constructed, never later.
//!
//! ## Verification rule
//!
//! A candidate secret `s` (hex-encoded) verifies against a reference iff
//!
//! ```text
//!     SHA-256(hex_decode(s)) == payment_hash
//! ```
//!
//! Anything that fails to decode, or hashes to a different value, simply does not verify; that
//! is a `false` answer, not an error.

use std::fmt::{Debug, Display};

use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum PayableReferenceError {
    #[error("Malformed payment hash commitment: {0}")]
    MalformedCommitment(String),
}

/// A payable reference together with its embedded preimage commitment.
#[derive(Clone, PartialEq, Eq)]
pub struct PayableReference {
    raw: String,
    payment_hash: [u8; 32],
}

impl PayableReference {
    /// Builds a payable reference from the raw string and the 64-hex-char commitment that the
    /// payment-request record carries with it. Fails fast on a malformed commitment.
    pub fn new(raw: &str, payment_hash_hex: &str) -> Result<Self, PayableReferenceError> {
        let bytes = hex::decode(payment_hash_hex)
            .map_err(|e| PayableReferenceError::MalformedCommitment(format!("{payment_hash_hex} is not valid hex: {e}")))?;
        let payment_hash: [u8; 32] = bytes
            .try_into()
            .map_err(|_| PayableReferenceError::MalformedCommitment(format!("{payment_hash_hex} is not 32 bytes")))?;
        Ok(Self { raw: raw.to_string(), payment_hash })
    }

    /// The raw reference string, as handed to wallets and matched against receipt events.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn payment_hash(&self) -> &[u8; 32] {
        &self.payment_hash
    }

    pub fn payment_hash_hex(&self) -> String {
        hex::encode(self.payment_hash)
    }

    /// Applies the verification rule above to a hex-encoded candidate secret.
    pub fn verify_preimage(&self, preimage_hex: &str) -> bool {
        let Ok(preimage) = hex::decode(preimage_hex) else {
            return false;
        };
        let digest = Sha256::digest(&preimage);
        digest.as_slice() == self.payment_hash
    }
}

impl Debug for PayableReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PayableReference({}, hash={})", self.raw, self.payment_hash_hex())
    }
}

impl Display for PayableReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    // SHA-256("abc"). The preimage is the bytes 0x61 0x62 0x63.
    const ABC_HASH: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    #[test]
    fn valid_preimage_verifies() {
        let payable = PayableReference::new("lnbc-test-reference", ABC_HASH).unwrap();
        assert!(payable.verify_preimage("616263"));
    }

    #[test]
    fn wrong_preimage_does_not_verify() {
        let payable = PayableReference::new("lnbc-test-reference", ABC_HASH).unwrap();
        assert!(!payable.verify_preimage("616264"));
    }

    #[test]
    fn non_hex_preimage_does_not_verify() {
        let payable = PayableReference::new("lnbc-test-reference", ABC_HASH).unwrap();
        assert!(!payable.verify_preimage("not hex at all"));
    }

    #[test]
    fn malformed_commitment_is_rejected() {
        assert!(PayableReference::new("ref", "zzzz").is_err());
        assert!(PayableReference::new("ref", "abcd").is_err());
    }

    #[test]
    fn round_trips_the_commitment() {
        let payable = PayableReference::new("ref", ABC_HASH).unwrap();
        assert_eq!(payable.payment_hash_hex(), ABC_HASH);
        assert_eq!(payable.raw(), "ref");
    }
}
