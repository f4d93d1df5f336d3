// Path: crates/core/src/signer.rs
//! The Signer collaborator: executes an off-client signing operation for a
//! SIGN-type context.

use tmrpc_crypto::algorithms::hash::keccak256;

use crate::transport::ResponseSlot;

/// Whether `message` is the already-computed digest or needs hashing first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignKind {
    /// `message` is raw bytes; the signer hashes it with Keccak-256 before signing.
    Hash,
    /// `message` is already a 32-byte digest; sign it directly.
    Raw,
}

/// A signing request: the message (or digest), the account expected to
/// produce the signature, and which of the two the message represents.
#[derive(Debug, Clone)]
pub struct SignRequest {
    pub message: Vec<u8>,
    pub account: [u8; 20],
    pub kind: SignKind,
}

impl SignRequest {
    /// The 32-byte digest that will actually be signed.
    pub fn digest(&self) -> [u8; 32] {
        match self.kind {
            SignKind::Hash => keccak256(&self.message),
            SignKind::Raw => {
                let mut out = [0u8; 32];
                let len = self.message.len().min(32);
                out[..len].copy_from_slice(&self.message[..len]);
                out
            }
        }
    }
}

/// Fills `slot` with a 65-byte recoverable signature, or marks it `Error`.
/// May complete synchronously or leave `slot` `Waiting` for later
/// out-of-band completion, exactly like [`crate::transport::Transport`].
pub trait Signer: Send {
    fn sign(&mut self, request: &SignRequest, slot: &mut ResponseSlot);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_mode_equivalent_to_raw_signing_of_keccak() {
        let message = b"hello world".to_vec();
        let hash_req = SignRequest {
            message: message.clone(),
            account: [0u8; 20],
            kind: SignKind::Hash,
        };
        let expected = keccak256(&message);
        assert_eq!(hash_req.digest(), expected);

        let raw_req = SignRequest {
            message: expected.to_vec(),
            account: [0u8; 20],
            kind: SignKind::Raw,
        };
        assert_eq!(raw_req.digest(), expected);
    }
}
