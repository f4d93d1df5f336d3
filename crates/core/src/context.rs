// Path: crates/core/src/context.rs
//! The Request Context and the `execute` state machine (§4.A).

use std::collections::HashSet;

use tmrpc_types::{ChainType, NodeProps};
use tracing::{debug, warn};

use crate::client::Client;
use crate::config::NODE_LIST_METHOD;
use crate::error::Error;
use crate::payload::RequestSpec;
use crate::selector::NodeFilter;
use crate::signer::SignRequest;
use crate::transport::{ResponseSlot, SlotState};
use crate::verifier::PreHandleStatus;

/// Whether a context drives a batch of RPCs or an off-client signing operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    Rpc,
    Sign,
}

/// The outcome `execute` feeds back to the verification-state field, distinct
/// from the transient [`ExecStatus`] returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationState {
    Waiting,
    Ok,
    Error(String),
    /// The attempt budget was exhausted for an "allowed to fail" method.
    Ignore,
}

/// The result of one `execute` call.
#[derive(Debug)]
pub enum ExecStatus {
    Ok,
    Waiting,
    Error(Error),
}

/// Per-call state for one request (or signing) operation, plus any sub-context
/// it depends on. Mutated only by `execute` and its callees.
pub struct RequestContext {
    pub kind: ContextKind,
    pub chain_id: u64,
    pub requests: Vec<RequestSpec>,
    pub picked_nodes: Vec<tmrpc_types::Node>,
    pub raw_responses: Vec<ResponseSlot>,
    pub parsed_responses: Option<Vec<serde_json::Value>>,
    pub error: Option<Error>,
    pub attempts: u32,
    pub verification_state: VerificationState,
    pub required: Option<Box<RequestContext>>,
    pub rejected_in_context: HashSet<u32>,
    pub signer_addresses: Vec<[u8; 20]>,
    pub sign_request: Option<SignRequest>,
    /// True once the external collaborator (transport or signer) has been
    /// asked to fill this attempt's slots; reset whenever a fresh pick is made.
    pub dispatched: bool,
    succeeded: bool,
    is_root: bool,
}

impl RequestContext {
    /// Creates an RPC-type context for `requests` against `chain_id`.
    pub fn new(kind: ContextKind, requests: Vec<RequestSpec>, chain_id: u64) -> Self {
        Self {
            kind,
            chain_id,
            requests,
            picked_nodes: Vec::new(),
            raw_responses: Vec::new(),
            parsed_responses: None,
            error: None,
            attempts: 0,
            verification_state: VerificationState::Waiting,
            required: None,
            rejected_in_context: HashSet::new(),
            signer_addresses: Vec::new(),
            sign_request: None,
            dispatched: false,
            succeeded: false,
            is_root: false,
        }
    }

    /// Creates a SIGN-type context that drives a single off-client signing
    /// operation. `chain_id` is carried only for error reporting.
    pub fn new_sign(sign_request: SignRequest, chain_id: u64) -> Self {
        let mut ctx = Self::new(ContextKind::Sign, Vec::new(), chain_id);
        ctx.raw_responses = vec![ResponseSlot::waiting()];
        ctx.sign_request = Some(sign_request);
        ctx
    }

    pub(crate) fn mark_root(&mut self) {
        self.is_root = true;
    }

    pub fn is_root(&self) -> bool {
        self.is_root
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    /// Prepends `child` to this context's sub-context chain. A verifier
    /// calls this from within `verify` (which only ever sees `&mut
    /// RequestContext`, never the `Client`) and returns
    /// [`crate::verifier::VerifyStatus::Waiting`]; the next call to
    /// `execute` discovers the unresolved child in step 4 and drives it.
    pub fn add_required(&mut self, mut child: RequestContext) {
        child.required = self.required.take();
        self.required = Some(Box::new(child));
    }

    /// Linear scan for a sub-context whose first request is `method`.
    pub fn find_required(&self, method: &str) -> Option<&RequestContext> {
        let mut current = self.required.as_deref();
        while let Some(node) = current {
            if node.requests.first().map(|r| r.method.as_str()) == Some(method) {
                return Some(node);
            }
            current = node.required.as_deref();
        }
        None
    }

    /// Unlinks and returns the sub-context whose first request is `method`,
    /// splicing its own `required` tail into the chain in its place.
    pub fn remove_required(&mut self, method: &str) -> Option<Box<RequestContext>> {
        let mut current: &mut RequestContext = self;
        loop {
            let matches = current
                .required
                .as_ref()
                .and_then(|c| c.requests.first())
                .map(|r| r.method.as_str())
                == Some(method);
            if matches {
                let mut removed = current.required.take()?;
                current.required = removed.required.take();
                return Some(removed);
            }
            match current.required.as_mut() {
                Some(next) => current = next,
                None => return None,
            }
        }
    }

    /// Descends to the leaf of the `required` chain that has not yet
    /// succeeded — the context the external driver must currently arrange
    /// transport or signing for.
    pub fn deepest_pending_mut(&mut self) -> &mut RequestContext {
        let mut current = self;
        loop {
            let descend = matches!(&current.required, Some(child) if !child.succeeded);
            if descend {
                current = current.required.as_deref_mut().expect("checked Some above");
            } else {
                break;
            }
        }
        current
    }

    /// The re-entrant state machine described in §4.A. Callable any number
    /// of times; returns `Waiting` while an external collaborator (sub-context,
    /// transport, or signer) has outstanding work.
    pub fn execute(&mut self, client: &mut Client) -> ExecStatus {
        let status = self.execute_inner(client);
        if matches!(status, ExecStatus::Ok) {
            self.succeeded = true;
        }
        status
    }

    fn execute_inner(&mut self, client: &mut Client) -> ExecStatus {
        // 1. a carried error is terminal.
        if let Some(err) = self.error.clone() {
            return ExecStatus::Error(err);
        }
        // 2. the first request must name a method.
        if self
            .requests
            .first()
            .map(|r| r.method.is_empty())
            .unwrap_or(self.kind == ContextKind::Rpc)
        {
            let err = Error::Config("request is missing a method".to_string());
            self.error = Some(err.clone());
            return ExecStatus::Error(err);
        }
        // 3. already fully verified.
        if self.parsed_responses.is_some() && self.verification_state == VerificationState::Ok {
            return ExecStatus::Ok;
        }
        // 4. an unresolved sub-context must advance first.
        if let Some(child) = self.required.as_mut() {
            if !child.succeeded {
                match child.execute(client) {
                    ExecStatus::Ok => {}
                    other => return other,
                }
            }
        }

        match self.kind {
            ContextKind::Rpc => self.execute_rpc(client),
            ContextKind::Sign => self.execute_sign(),
        }
    }

    fn execute_rpc(&mut self, client: &mut Client) -> ExecStatus {
        let now = client.now();

        let chain_type = match client.chains.get(&self.chain_id) {
            Some(chain) => chain.chain_type,
            None => {
                let err = Error::NotFound(format!("chain {}", self.chain_id));
                self.error = Some(err.clone());
                return ExecStatus::Error(err);
            }
        };

        if client.verifiers.get_mut(chain_type).is_none() {
            let err = Error::NotFound(format!("no verifier registered for {chain_type:?}"));
            self.error = Some(err.clone());
            return ExecStatus::Error(err);
        }

        // c. give the verifier a chance to answer internally.
        if self.raw_responses.is_empty() && self.parsed_responses.is_none() {
            let pre = client
                .verifiers
                .get_mut(chain_type)
                .expect("checked above")
                .pre_handle(self);
            match pre {
                PreHandleStatus::Answered(value) => {
                    self.parsed_responses = Some(vec![value]);
                    self.verification_state = VerificationState::Ok;
                    return ExecStatus::Ok;
                }
                PreHandleStatus::Error(message) => {
                    let err = Error::Rpc(message);
                    self.error = Some(err.clone());
                    return ExecStatus::Error(err);
                }
                PreHandleStatus::NotHandled => {}
            }
        }

        // d. select nodes if none picked yet.
        if self.raw_responses.is_empty() && self.picked_nodes.is_empty() {
            let method = self
                .requests
                .first()
                .map(|r| r.method.clone())
                .unwrap_or_default();

            let mut props = NodeProps::DATA;
            if client.config.http_only {
                props |= NodeProps::HTTP;
            }
            if client.config.proof_requested {
                props |= NodeProps::PROOF;
            }
            let filter = NodeFilter {
                props,
                hinted_addresses: Vec::new(),
            };

            let chain = client.chains.get(&self.chain_id).expect("checked above");
            let picked = client.selector.pick(
                chain,
                client.config.request_count,
                &filter,
                &self.rejected_in_context,
                now,
            );

            let nodes = match picked {
                Ok(nodes) => nodes,
                Err(e) => {
                    let err = Error::Config(format!("node selection failed: {e}"));
                    self.error = Some(err.clone());
                    return ExecStatus::Error(err);
                }
            };

            self.raw_responses = nodes.iter().map(|_| ResponseSlot::waiting()).collect();
            self.picked_nodes = nodes;
            self.dispatched = false;
            debug!(chain_id = self.chain_id, method = %method, picked = self.picked_nodes.len(), "nodes selected");

            let wants_signers = client.config.signature_count > 0
                || (method == NODE_LIST_METHOD && chain_type != ChainType::Bitcoin);
            if wants_signers && client.config.signature_count > 0 {
                let signer_filter = NodeFilter {
                    props: NodeProps::SIGNER,
                    hinted_addresses: Vec::new(),
                };
                if let Ok(signers) = client.selector.pick(
                    chain,
                    client.config.signature_count,
                    &signer_filter,
                    &self.rejected_in_context,
                    now,
                ) {
                    self.signer_addresses = signers.iter().map(|n| n.address).collect();
                }
            }
        }

        // e. nothing received yet: the driver must arrange transport.
        if self.raw_responses.is_empty() || self.raw_responses.iter().all(ResponseSlot::is_waiting)
        {
            return ExecStatus::Waiting;
        }

        // f. hand off to the Response Matcher.
        let status = crate::matcher::match_responses(self, client, now);
        match status {
            ExecStatus::Waiting | ExecStatus::Ok => {
                if let Some(cache) = client.cache.as_mut() {
                    if let Some(chain) = client.chains.get(&self.chain_id) {
                        let key = crate::cache::nodelist_key(self.chain_id);
                        cache.store(key.as_str(), crate::cache::encode_nodelist(chain));
                    }
                }
                status
            }
            ExecStatus::Error(_) => {
                self.raw_responses.clear();
                self.picked_nodes.clear();
                self.parsed_responses = None;
                self.attempts += 1;

                if self.attempts < client.config.max_attempts {
                    warn!(chain_id = self.chain_id, attempts = self.attempts, "retrying with fresh pick");
                    self.error = None;
                    self.verification_state = VerificationState::Waiting;
                    self.dispatched = false;
                    self.execute(client)
                } else if self
                    .requests
                    .first()
                    .map(|r| r.method == NODE_LIST_METHOD)
                    .unwrap_or(false)
                {
                    self.verification_state = VerificationState::Ignore;
                    self.error = None;
                    ExecStatus::Error(Error::Ignore)
                } else {
                    self.error = Some(Error::Limit);
                    ExecStatus::Error(Error::Limit)
                }
            }
        }
    }

    fn execute_sign(&mut self) -> ExecStatus {
        match self.raw_responses.first() {
            None => ExecStatus::Waiting,
            Some(slot) if slot.is_waiting() => ExecStatus::Waiting,
            Some(slot) if slot.state == SlotState::Error => {
                let message = String::from_utf8_lossy(&slot.data).to_string();
                let err = Error::Rpc(message);
                self.error = Some(err.clone());
                ExecStatus::Error(err)
            }
            Some(_) => {
                self.verification_state = VerificationState::Ok;
                ExecStatus::Ok
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{RequestId, RequestSpec};
    use serde_json::json;

    #[test]
    fn missing_method_is_config_error() {
        let requests = vec![RequestSpec::new(RequestId::Int(1), "", json!([]))];
        let mut ctx = RequestContext::new(ContextKind::Rpc, requests, 1);
        let mut client = crate::client::Client::for_tests(1);
        match ctx.execute(&mut client) {
            ExecStatus::Error(Error::Config(_)) => {}
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn remove_required_splices_tail() {
        let mut root = RequestContext::new(
            ContextKind::Rpc,
            vec![RequestSpec::new(RequestId::Int(1), "root", json!([]))],
            1,
        );
        let a = RequestContext::new(
            ContextKind::Rpc,
            vec![RequestSpec::new(RequestId::Int(2), "a", json!([]))],
            1,
        );
        let b = RequestContext::new(
            ContextKind::Rpc,
            vec![RequestSpec::new(RequestId::Int(3), "b", json!([]))],
            1,
        );
        root.required = Some(Box::new(a));
        root.required.as_mut().expect("a").required = Some(Box::new(b));

        let removed = root.remove_required("a").expect("found a");
        assert_eq!(removed.requests[0].method, "a");
        assert_eq!(
            root.required.as_ref().expect("b remains").requests[0].method,
            "b"
        );
    }

    #[test]
    fn find_required_scans_chain() {
        let mut root = RequestContext::new(
            ContextKind::Rpc,
            vec![RequestSpec::new(RequestId::Int(1), "root", json!([]))],
            1,
        );
        let child = RequestContext::new(
            ContextKind::Rpc,
            vec![RequestSpec::new(RequestId::Int(2), "sibling", json!([]))],
            1,
        );
        root.required = Some(Box::new(child));
        assert!(root.find_required("sibling").is_some());
        assert!(root.find_required("nonexistent").is_none());
    }
}
