// Path: crates/core/src/lib.rs
#![cfg_attr(
    not(test),
    deny(clippy::unwrap_used, clippy::panic, clippy::unimplemented, clippy::todo)
)]

//! # tmrpc-core
//!
//! The request-execution state machine at the heart of the trust-minimised
//! RPC client: composes and signs outbound batches, drives the re-entrant
//! [`context::RequestContext::execute`] loop against pluggable transport,
//! signer, verifier, node-selector, and cache collaborators, and manages
//! node reputation and node-list auto-update scheduling.

pub mod autoupdate;
pub mod cache;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
mod matcher;
pub mod payload;
pub mod reputation;
pub mod selector;
pub mod signer;
pub mod transport;
pub mod verifier;

pub use client::Client;
pub use config::ClientConfig;
pub use context::{ContextKind, ExecStatus, RequestContext, VerificationState};
pub use error::{Error, Result};
