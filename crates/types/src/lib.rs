// Path: crates/types/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # tmrpc-types
//!
//! Core data structures and error types shared across the trust-minimised
//! RPC client core: node/chain/weight records, the error enum surfaced by
//! every collaborator trait, and the cache wire-format version.

pub mod chain;
pub mod error;
pub mod node;

pub use chain::{Chain, ChainType, NodeListUpdate, PendingNodeListUpdate, Whitelist};
pub use error::Error;
pub use node::{Node, NodeProps, NodeWeight};

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// The `in3`-style protocol version embedded in every outbound request.
///
/// Kept as a single named constant so a protocol bump touches one location.
pub const PROTOCOL_VERSION: &str = "2.1.0";

/// Current version byte of the node-list / whitelist cache record format.
pub const CACHE_VERSION: u8 = 3;
