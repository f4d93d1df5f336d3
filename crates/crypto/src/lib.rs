// Path: crates/crypto/src/lib.rs
//! # tmrpc-crypto
//!
//! Cryptographic primitives for the trust-minimised RPC client core:
//! Keccak-256 hashing (request digests and trie-node hashes) and secp256k1
//! ECDSA signing/recovery (request signatures and signed-response checks).
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]

pub mod algorithms;
pub mod error;
pub mod sign;
