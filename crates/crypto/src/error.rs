// Path: crates/crypto/src/error.rs
//! Local error type for the `tmrpc-crypto` crate.

use thiserror::Error;

/// Errors surfaced by hashing, signing, and signature-recovery operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// A key or signature byte string had the wrong length or encoding.
    #[error("invalid key: {0}")]
    InvalidKey(String),
    /// A signature failed to parse, recover, or verify.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    /// The underlying curve/hash implementation rejected the operation.
    #[error("signing operation failed: {0}")]
    SigningFailed(String),
}
