// Path: crates/crypto/src/algorithms/hash/mod.rs
//! Keccak-256, the digest used both for request signing and for proof
//! verification (state/receipt trie node hashes).

use sha3::{Digest, Keccak256};

/// A hash function producing a fixed-size digest.
pub trait HashFunction {
    /// Hash `message` and return the digest.
    fn hash(&self, message: &[u8]) -> Vec<u8>;

    /// The digest size in bytes.
    fn digest_size(&self) -> usize;
}

/// Keccak-256 (the original, pre-NIST-standardisation padding used
/// throughout Ethereum, not SHA3-256).
#[derive(Default, Clone, Copy)]
pub struct Keccak256Hash;

impl HashFunction for Keccak256Hash {
    fn hash(&self, message: &[u8]) -> Vec<u8> {
        keccak256(message).to_vec()
    }

    fn digest_size(&self) -> usize {
        32
    }
}

/// Hashes `data` with Keccak-256.
pub fn keccak256<T: AsRef<[u8]>>(data: T) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data.as_ref());
    hasher.finalize().into()
}

/// Incremental Keccak-256 hasher, used by the payload composer to stream an
/// `id`/`method`/`params` document in-order without materialising the whole
/// signing buffer first.
#[derive(Default)]
pub struct Keccak256Builder(Keccak256);

impl Keccak256Builder {
    /// Starts a fresh incremental digest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds another chunk of bytes into the digest.
    pub fn update(&mut self, bytes: &[u8]) {
        self.0.update(bytes);
    }

    /// Consumes the builder and returns the final 32-byte digest.
    pub fn finalize(self) -> [u8; 32] {
        self.0.finalize().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_matches_known_vector() {
        let digest = keccak256(b"");
        assert_eq!(
            hex::encode(digest),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a472"
        );
    }

    #[test]
    fn builder_matches_one_shot() {
        let mut builder = Keccak256Builder::new();
        builder.update(b"hello");
        builder.update(b" world");
        assert_eq!(builder.finalize(), keccak256(b"hello world"));
    }
}
