// Path: crates/crypto/src/sign/secp256k1/mod.rs
//! secp256k1 ECDSA signing and address recovery, used to sign outbound
//! request digests and to verify node signatures on signed responses.

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;

use crate::algorithms::hash::keccak256;
use crate::error::CryptoError;

/// A recoverable ECDSA signature: 32-byte `r`, 32-byte `s`, and a 1-byte
/// recovery id, concatenated as `r || s || v`.
pub type RecoverableSignatureBytes = [u8; 65];

/// An secp256k1 key pair used to sign request digests.
///
/// Wraps [`SigningKey`], which zeroizes its scalar on drop.
pub struct Secp256k1KeyPair {
    secret: SigningKey,
}

impl Secp256k1KeyPair {
    /// Generates a new random key pair.
    pub fn generate() -> Self {
        Self {
            secret: SigningKey::random(&mut rand::rngs::OsRng),
        }
    }

    /// Builds a key pair from a 32-byte private scalar.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let secret = SigningKey::from_slice(bytes)
            .map_err(|e| CryptoError::InvalidKey(format!("bad secp256k1 scalar: {e}")))?;
        Ok(Self { secret })
    }

    /// Returns the 20-byte address derived from this key's public point, the
    /// way node addresses are derived throughout the node registry: the
    /// low 20 bytes of `keccak256(uncompressed_pubkey[1..])`.
    pub fn address(&self) -> [u8; 20] {
        address_from_verifying_key(self.secret.verifying_key())
    }

    /// Signs a pre-computed 32-byte digest, returning `r || s || v`.
    ///
    /// Uses the low-s, RFC6979-deterministic-nonce variant k256 produces by
    /// default, so two signatures over the same digest with the same key
    /// are byte-identical.
    pub fn sign_prehash(&self, digest: &[u8; 32]) -> Result<RecoverableSignatureBytes, CryptoError> {
        let (signature, recovery_id): (Signature, RecoveryId) = self
            .secret
            .sign_prehash_recoverable(digest)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
        encode_recoverable(&signature, recovery_id)
    }
}

/// Recovers the 20-byte signer address from a digest and a recoverable
/// signature, the way a signed response's `signatures[].signer` field is
/// cross-checked against the node that produced it.
pub fn recover_address(
    digest: &[u8; 32],
    signature: &RecoverableSignatureBytes,
) -> Result<[u8; 20], CryptoError> {
    let (sig, recovery_id) = decode_recoverable(signature)?;
    let verifying_key = VerifyingKey::recover_from_prehash(digest, &sig, recovery_id)
        .map_err(|e| CryptoError::InvalidSignature(format!("recovery failed: {e}")))?;
    Ok(address_from_verifying_key(&verifying_key))
}

fn address_from_verifying_key(key: &VerifyingKey) -> [u8; 20] {
    let encoded = key.to_encoded_point(false);
    // Drop the leading 0x04 tag before hashing, matching how account
    // addresses are derived from uncompressed public keys.
    let digest = keccak256(&encoded.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&digest[12..]);
    address
}

fn encode_recoverable(
    signature: &Signature,
    recovery_id: RecoveryId,
) -> Result<RecoverableSignatureBytes, CryptoError> {
    let mut out = [0u8; 65];
    out[..64].copy_from_slice(&signature.to_bytes());
    out[64] = recovery_id.to_byte();
    Ok(out)
}

fn decode_recoverable(bytes: &RecoverableSignatureBytes) -> Result<(Signature, RecoveryId), CryptoError> {
    let signature = Signature::from_slice(&bytes[..64])
        .map_err(|e| CryptoError::InvalidSignature(format!("bad r/s: {e}")))?;
    let recovery_id = RecoveryId::from_byte(bytes[64])
        .ok_or_else(|| CryptoError::InvalidSignature("bad recovery id".to_string()))?;
    Ok((signature, recovery_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_recover_roundtrip() {
        let key = Secp256k1KeyPair::generate();
        let digest = keccak256(b"request digest");
        let signature = key.sign_prehash(&digest).expect("sign");
        let recovered = recover_address(&digest, &signature).expect("recover");
        assert_eq!(recovered, key.address());
    }

    #[test]
    fn signing_is_deterministic() {
        let key = Secp256k1KeyPair::generate();
        let digest = keccak256(b"same digest twice");
        let first = key.sign_prehash(&digest).expect("sign");
        let second = key.sign_prehash(&digest).expect("sign");
        assert_eq!(first, second);
    }

    #[test]
    fn recover_fails_for_tampered_digest() {
        let key = Secp256k1KeyPair::generate();
        let digest = keccak256(b"original");
        let signature = key.sign_prehash(&digest).expect("sign");
        let tampered = keccak256(b"tampered");
        let recovered = recover_address(&tampered, &signature).expect("recover still succeeds");
        assert_ne!(recovered, key.address());
    }
}
