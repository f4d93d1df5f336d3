// Path: crates/types/src/error.rs
//! The error enum surfaced by every collaborator trait and by
//! [`crate::Result`].

use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
///
/// Mirrors the classification the original client exposed as an `in3_ret_t`
/// status code, but keeps the payload a typed enum instead of a raw integer.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// Errors surfaced by the request-execution core and its collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A request or configuration value was malformed.
    #[error("invalid argument: {0}")]
    InvalidArg(String),
    /// The client or chain configuration is missing something required to proceed.
    #[error("config error: {0}")]
    Config(String),
    /// A chain, verifier, or sub-context could not be located.
    #[error("not found: {0}")]
    NotFound(String),
    /// A response body could not be parsed or did not match the expected shape.
    #[error("invalid data: {0}")]
    InvalidData(String),
    /// A node returned a JSON-RPC error result.
    #[error("rpc error: {0}")]
    Rpc(String),
    /// The requested operation is not implemented by this build.
    #[error("not supported: {0}")]
    NotSupported(String),
    /// A collaborator failed in a way that does not fit any other variant.
    #[error("unknown error: {0}")]
    Unknown(String),
    /// Allocation failure surfaced by a collaborator.
    #[error("out of memory")]
    OutOfMemory,
    /// The attempt budget (`Client::max_attempts`) was exhausted.
    #[error("max attempts reached")]
    Limit,
    /// Not a terminal state: an external collaborator (transport, signer,
    /// sub-context) has outstanding work.
    #[error("waiting for external collaborator")]
    Waiting,
    /// A cached record did not match [`crate::CACHE_VERSION`] and was discarded.
    #[error("cache version mismatch")]
    Version,
    /// The attempt budget was exhausted for a method in the "allowed to
    /// fail" set; the caller may continue with stale data.
    #[error("allowed to fail, ignoring")]
    Ignore,
}

impl ErrorCode for Error {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidArg(_) => "INVALID_ARG",
            Self::Config(_) => "CONFIG",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidData(_) => "INVALID_DATA",
            Self::Rpc(_) => "RPC",
            Self::NotSupported(_) => "NOT_SUPPORTED",
            Self::Unknown(_) => "UNKNOWN",
            Self::OutOfMemory => "OUT_OF_MEMORY",
            Self::Limit => "LIMIT",
            Self::Waiting => "WAITING",
            Self::Version => "VERSION",
            Self::Ignore => "IGNORE",
        }
    }
}

impl Error {
    /// True for the handful of variants that represent "not terminal yet"
    /// rather than a true failure.
    pub fn is_waiting(&self) -> bool {
        matches!(self, Error::Waiting)
    }
}
