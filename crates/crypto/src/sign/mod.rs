// Path: crates/crypto/src/sign/mod.rs
//! Request signing: secp256k1 ECDSA over a Keccak-256 request digest.

pub mod secp256k1;
