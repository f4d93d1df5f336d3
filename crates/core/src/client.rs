// Path: crates/core/src/client.rs
//! The long-lived owner of chain state and collaborators, and the driver
//! loop that feeds transport/signer work to a [`RequestContext`] between
//! calls to `execute`.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use tmrpc_types::Chain;
use tracing::warn;

use crate::cache::Cache;
use crate::config::ClientConfig;
use crate::context::{ContextKind, ExecStatus, RequestContext};
use crate::error::{Error, Result};
use crate::payload::{ProofConfig, Verification};
use crate::selector::NodeSelector;
use crate::signer::Signer;
use crate::transport::{downgrade_to_http, Transport, TransportRequest};
use crate::verifier::VerifierRegistry;

/// How many consecutive `Waiting` results the driver will tolerate without
/// any collaborator being newly dispatched, before giving up. Guards against
/// a misbehaving collaborator that never fills a slot.
const MAX_IDLE_WAITS: u32 = 10;

/// Owns chain state and every external collaborator a [`RequestContext`]
/// needs to reach completion.
pub struct Client {
    pub config: ClientConfig,
    pub chains: HashMap<u64, Chain>,
    pub selector: Box<dyn NodeSelector>,
    pub transport: Box<dyn Transport>,
    pub signer: Box<dyn Signer>,
    pub verifiers: VerifierRegistry,
    pub cache: Option<Box<dyn Cache>>,
    clock: Box<dyn Fn() -> u64 + Send>,
}

impl Client {
    pub fn new(
        config: ClientConfig,
        selector: Box<dyn NodeSelector>,
        transport: Box<dyn Transport>,
        signer: Box<dyn Signer>,
        verifiers: VerifierRegistry,
        cache: Option<Box<dyn Cache>>,
    ) -> Self {
        Self {
            config,
            chains: HashMap::new(),
            selector,
            transport,
            signer,
            verifiers,
            cache,
            clock: Box::new(|| {
                SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0)
            }),
        }
    }

    /// Overrides the clock used for blacklist/auto-update timestamps; the
    /// default reads the system wall clock.
    pub fn with_clock(mut self, clock: Box<dyn Fn() -> u64 + Send>) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> u64 {
        (self.clock)()
    }

    pub fn add_chain(&mut self, chain: Chain) {
        self.chains.insert(chain.chain_id, chain);
    }

    /// Loads a cached node list for every configured chain, the way
    /// `in3_cache_init` warms a freshly constructed client. A chain whose
    /// cached entry is missing, version-mismatched, or corrupt is left with
    /// whatever node list it already had; the failure is logged, never fatal.
    pub fn warm_cache_from_cache(&mut self) {
        let chain_ids: Vec<u64> = self.chains.keys().copied().collect();
        for chain_id in chain_ids {
            let Some(cache) = self.cache.as_ref() else {
                return;
            };
            let key = crate::cache::nodelist_key(chain_id);
            let Some(bytes) = cache.load(&key) else {
                continue;
            };
            match crate::cache::decode_nodelist(&bytes) {
                Ok(decoded) => {
                    if let Some(chain) = self.chains.get_mut(&chain_id) {
                        chain.registry = decoded.registry;
                        chain.node_list_update.last_block = decoded.last_block;
                        chain.node_list_update.trusted = true;
                        chain.nodes = decoded.nodes.into_iter().map(|n| (n.index, n)).collect();
                        chain.weights = decoded.weights.into_iter().collect();
                    }
                }
                Err(error) => {
                    warn!(chain_id, %error, "discarding cached node list");
                }
            }

            let whitelist_key = format!("whitelist_{chain_id}");
            if let Some(bytes) = cache.load(&whitelist_key) {
                match crate::cache::decode_whitelist(&bytes) {
                    Ok(whitelist) => {
                        if let Some(chain) = self.chains.get_mut(&chain_id) {
                            chain.whitelist = Some(whitelist);
                        }
                    }
                    Err(error) => {
                        warn!(chain_id, %error, "discarding cached whitelist");
                    }
                }
            }
        }
    }

    /// Drives an RPC-type `ctx` to completion, arranging transport work
    /// whenever `execute` reports `Waiting`, and returns its verified,
    /// parsed results.
    pub fn send_context(&mut self, ctx: &mut RequestContext) -> Result<Vec<Value>> {
        self.drive(ctx)?;
        ctx.parsed_responses
            .clone()
            .ok_or_else(|| Error::Unknown("execute reported ok with no parsed response".into()))
    }

    /// Drives a SIGN-type context built from `sign_request` to completion
    /// and returns the 65-byte recoverable signature it produced.
    pub fn sign(&mut self, sign_request: crate::signer::SignRequest, chain_id: u64) -> Result<[u8; 65]> {
        let mut ctx = RequestContext::new_sign(sign_request, chain_id);
        self.drive(&mut ctx)?;
        let slot = ctx
            .raw_responses
            .first()
            .ok_or_else(|| Error::Unknown("signer produced no response slot".into()))?;
        if slot.data.len() != 65 {
            return Err(Error::InvalidData(format!(
                "signer produced {} bytes, expected 65",
                slot.data.len()
            )));
        }
        let mut out = [0u8; 65];
        out.copy_from_slice(&slot.data);
        Ok(out)
    }

    /// Repeatedly calls `execute`, arranging transport or signer work
    /// whenever it reports `Waiting`, until it reports `Ok` or a terminal
    /// `Error`.
    fn drive(&mut self, ctx: &mut RequestContext) -> Result<()> {
        ctx.mark_root();
        let mut idle_waits = 0u32;

        loop {
            match ctx.execute(self) {
                ExecStatus::Ok => return Ok(()),
                ExecStatus::Error(err) => return Err(err),
                ExecStatus::Waiting => {
                    if self.dispatch_pending(ctx) {
                        idle_waits = 0;
                    } else {
                        idle_waits += 1;
                    }
                    if idle_waits > MAX_IDLE_WAITS {
                        return Err(Error::Unknown(
                            "no collaborator progress after repeated waits".into(),
                        ));
                    }
                }
            }
        }
    }

    /// Finds the leaf of the sub-context chain currently blocking progress
    /// and, if it has not yet been handed to its collaborator for this
    /// attempt, does so. Returns whether a collaborator was newly dispatched.
    fn dispatch_pending(&mut self, ctx: &mut RequestContext) -> bool {
        let active = ctx.deepest_pending_mut();
        match active.kind {
            ContextKind::Rpc => {
                if active.dispatched || active.picked_nodes.is_empty() {
                    return false;
                }
                let proof = self.build_proof_config(active);
                let payload = crate::payload::compose_batch(&active.requests, proof.as_ref());
                let urls: Vec<String> = active
                    .picked_nodes
                    .iter()
                    .map(|node| {
                        if self.config.http_only {
                            downgrade_to_http(&node.url)
                        } else {
                            node.url.clone()
                        }
                    })
                    .collect();
                let request = TransportRequest {
                    urls,
                    payload,
                    timeout_ms: self.config.timeout_ms,
                };
                self.transport.send(&request, &mut active.raw_responses);
                active.dispatched = true;
                true
            }
            ContextKind::Sign => {
                if active.dispatched {
                    return false;
                }
                let Some(sign_request) = active.sign_request.clone() else {
                    return false;
                };
                if let Some(slot) = active.raw_responses.get_mut(0) {
                    self.signer.sign(&sign_request, slot);
                }
                active.dispatched = true;
                true
            }
        }
    }

    fn build_proof_config(&self, ctx: &RequestContext) -> Option<ProofConfig> {
        if !self.config.proof_requested && ctx.signer_addresses.is_empty() {
            return None;
        }
        let whitelist_contract = self
            .chains
            .get(&ctx.chain_id)
            .and_then(|chain| chain.whitelist.as_ref())
            .map(|w| w.contract);

        Some(ProofConfig {
            verification: Some(if self.config.proof_requested {
                Verification::Proof
            } else {
                Verification::Never
            }),
            chain_id: Some(ctx.chain_id),
            whitelist_contract,
            signature: None,
            finality: self.config.finality,
            latest_block: self.config.latest_block,
            signers: ctx.signer_addresses.clone(),
            include_code: self.config.include_code,
            full_proof: self.config.full_proof,
            no_stats: self.config.no_stats,
            use_binary: self.config.use_binary,
            verified_hashes: Vec::new(),
        })
    }
}

#[cfg(test)]
mod test_support {
    use super::*;
    use crate::selector::{NodeFilter, WeightedNodeSelector};
    use crate::signer::SignRequest;
    use crate::transport::ResponseSlot;
    use std::collections::HashSet;

    struct NopTransport;
    impl Transport for NopTransport {
        fn send(&mut self, _request: &TransportRequest, _slots: &mut [ResponseSlot]) {}
    }

    struct NopSigner;
    impl Signer for NopSigner {
        fn sign(&mut self, _request: &SignRequest, _slot: &mut ResponseSlot) {}
    }

    // Only used to exercise `WeightedNodeSelector`'s error path through the
    // `NodeSelector` trait object in tests that never reach node selection.
    struct PassthroughSelector(WeightedNodeSelector);
    impl NodeSelector for PassthroughSelector {
        fn pick(
            &mut self,
            chain: &Chain,
            n: usize,
            filter: &NodeFilter,
            rejected: &HashSet<u32>,
            now: u64,
        ) -> Result<Vec<tmrpc_types::Node>> {
            self.0.pick(chain, n, filter, rejected, now)
        }
    }

    impl Client {
        /// A client wired with inert collaborators and a fixed clock,
        /// suitable for exercising `execute`'s early-exit paths.
        pub fn for_tests(chain_id: u64) -> Client {
            let mut client = Client::new(
                ClientConfig::new(chain_id),
                Box::new(PassthroughSelector(WeightedNodeSelector)),
                Box::new(NopTransport),
                Box::new(NopSigner),
                VerifierRegistry::new(),
                None,
            )
            .with_clock(Box::new(|| 0));
            client.add_chain(Chain::new(chain_id, tmrpc_types::ChainType::Generic, [0u8; 20]));
            client
        }
    }
}
