// Path: crates/core/src/verifier.rs
//! The per-chain-type Verifier plug-in registry and dispatch contract.

use std::collections::HashMap;

use serde_json::Value;
use tmrpc_types::{Chain, ChainType};

use crate::context::RequestContext;

/// The view a verifier gets of one request/response pair.
pub struct VerifierContext<'a> {
    pub chain: &'a Chain,
    pub request: &'a Value,
    pub result: Option<&'a Value>,
    pub last_validator_change: Option<u64>,
    pub current_block: Option<u64>,
    pub proof: Option<&'a Value>,
}

/// The outcome of a verification attempt.
pub enum VerifyStatus {
    Ok,
    /// The verifier scheduled a sub-context (e.g. a sibling RPC it needs to
    /// cross-check the proof against) and must be re-polled later.
    Waiting,
    Error(String),
}

/// What a verifier's `pre_handle` hook decided, before any node is contacted.
pub enum PreHandleStatus {
    /// Nothing to answer internally; proceed to node selection.
    NotHandled,
    /// The request was answered without contacting a node; `result` becomes
    /// the context's parsed response.
    Answered(Value),
    Error(String),
}

/// A chain-type-specific verifier plug-in.
pub trait Verifier: Send {
    /// A chance to answer a request internally (e.g. from a local cache)
    /// before any node is contacted. Most verifiers never handle anything
    /// here and should return `NotHandled`.
    fn pre_handle(&mut self, _ctx: &RequestContext) -> PreHandleStatus {
        PreHandleStatus::NotHandled
    }

    /// Verifies one request/response pair. May mutate `parent` to attach a
    /// sub-context (via [`RequestContext::add_required`]) and return
    /// `Waiting` when it needs a sibling RPC resolved first.
    fn verify(&mut self, parent: &mut RequestContext, vctx: &VerifierContext) -> VerifyStatus;
}

/// A verifier that accepts every response unconditionally, without
/// inspecting any proof. Used for [`ChainType::Generic`] and as the
/// fallback when no proof was requested.
#[derive(Debug, Default)]
pub struct TrustingVerifier;

impl Verifier for TrustingVerifier {
    fn verify(&mut self, _parent: &mut RequestContext, vctx: &VerifierContext) -> VerifyStatus {
        match vctx.result {
            Some(_) => VerifyStatus::Ok,
            None => VerifyStatus::Error("missing result".to_string()),
        }
    }
}

/// A registry of verifiers keyed by chain type, looked up once per RPC
/// context before the Response Matcher runs.
#[derive(Default)]
pub struct VerifierRegistry {
    verifiers: HashMap<ChainType, Box<dyn Verifier>>,
}

impl VerifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, chain_type: ChainType, verifier: Box<dyn Verifier>) {
        self.verifiers.insert(chain_type, verifier);
    }

    pub fn get_mut(&mut self, chain_type: ChainType) -> Option<&mut Box<dyn Verifier>> {
        self.verifiers.get_mut(&chain_type)
    }
}
