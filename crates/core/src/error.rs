// Path: crates/core/src/error.rs
//! Re-exports the workspace-wide error currency; `tmrpc-core` does not
//! define its own error enum, per the closed set in the external interface.

pub use tmrpc_types::{Error, Result};
