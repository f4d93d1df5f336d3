// Path: crates/core/tests/scenarios.rs
//! End-to-end exercises of the `execute`/`send_context` state machine
//! against scripted transport, signer, and verifier collaborators.

use std::collections::{HashMap, HashSet};

use serde_json::{json, Value};
use tmrpc_core::cache::Cache;
use tmrpc_core::client::Client;
use tmrpc_core::config::ClientConfig;
use tmrpc_core::context::{ContextKind, RequestContext};
use tmrpc_core::payload::{RequestId, RequestSpec};
use tmrpc_core::selector::{NodeFilter, NodeSelector};
use tmrpc_core::signer::{SignKind, SignRequest, Signer};
use tmrpc_core::transport::{ResponseSlot, SlotState, Transport, TransportRequest};
use tmrpc_core::verifier::{TrustingVerifier, VerifierContext, VerifierRegistry, VerifyStatus};
use tmrpc_core::Error;
use tmrpc_types::{Chain, ChainType, Node, NodeProps};

/// Hands back canned bytes (or an error) keyed by the URL each slot was
/// addressed to, in URL order.
struct ScriptedTransport {
    responses: HashMap<String, Result<&'static str, &'static str>>,
}

impl Transport for ScriptedTransport {
    fn send(&mut self, request: &TransportRequest, slots: &mut [ResponseSlot]) {
        for (slot, url) in slots.iter_mut().zip(request.urls.iter()) {
            match self.responses.get(url) {
                Some(Ok(body)) => {
                    slot.state = SlotState::Ok;
                    slot.data = body.as_bytes().to_vec();
                }
                Some(Err(message)) => {
                    slot.state = SlotState::Error;
                    slot.data = message.as_bytes().to_vec();
                }
                None => {
                    slot.state = SlotState::Error;
                    slot.data = b"no script for this url".to_vec();
                }
            }
        }
    }
}

struct EchoSigner;
impl Signer for EchoSigner {
    fn sign(&mut self, request: &SignRequest, slot: &mut ResponseSlot) {
        slot.state = SlotState::Ok;
        let mut sig = request.digest().to_vec();
        sig.extend_from_slice(&[0u8; 33]);
        slot.data = sig;
    }
}

struct InMemoryCache(HashMap<String, Vec<u8>>);
impl Cache for InMemoryCache {
    fn load(&self, key: &str) -> Option<Vec<u8>> {
        self.0.get(key).cloned()
    }
    fn store(&mut self, key: &str, data: Vec<u8>) {
        self.0.insert(key.to_string(), data);
    }
}

/// Deterministic selector that walks the chain's eligible nodes in index
/// order rather than latency order, so tests can predict exactly which node
/// is tried first.
#[derive(Default)]
struct InOrderSelector;
impl NodeSelector for InOrderSelector {
    fn pick(
        &mut self,
        chain: &Chain,
        n: usize,
        filter: &NodeFilter,
        rejected: &HashSet<u32>,
        now: u64,
    ) -> tmrpc_types::Result<Vec<Node>> {
        let mut nodes: Vec<&Node> = chain
            .eligible_nodes(now)
            .into_iter()
            .filter(|node| !rejected.contains(&node.index))
            .filter(|node| node.props.contains(filter.props))
            .collect();
        nodes.sort_by_key(|n| n.index);
        if nodes.is_empty() {
            return Err(Error::Config("no eligible nodes".into()));
        }
        Ok(nodes.into_iter().take(n.max(1)).cloned().collect())
    }
}

fn node(index: u32, url: &str) -> Node {
    Node {
        address: [index as u8; 20],
        url: url.to_string(),
        props: NodeProps::DATA | NodeProps::PROOF,
        capacity: 10,
        index,
        deposit: 1_000,
        whitelisted: true,
    }
}

fn test_client(responses: HashMap<String, Result<&'static str, &'static str>>) -> Client {
    let mut registry = VerifierRegistry::new();
    registry.register(ChainType::Generic, Box::new(TrustingVerifier));

    let mut client = Client::new(
        ClientConfig::new(1),
        Box::new(InOrderSelector),
        Box::new(ScriptedTransport { responses }),
        Box::new(EchoSigner),
        registry,
        Some(Box::new(InMemoryCache(HashMap::new()))),
    )
    .with_clock(Box::new(|| 1_000));

    let mut chain = Chain::new(1, ChainType::Generic, [0u8; 20]);
    chain.nodes.insert(0, node(0, "https://a.example"));
    chain.nodes.insert(1, node(1, "https://b.example"));
    chain.nodes.insert(2, node(2, "https://c.example"));
    client.add_chain(chain);
    client
}

fn request(method: &str) -> Vec<RequestSpec> {
    vec![RequestSpec::new(RequestId::Int(1), method, json!([]))]
}

#[test]
fn happy_path_single_node_succeeds() {
    let mut responses = HashMap::new();
    responses.insert(
        "https://a.example".to_string(),
        Ok(r#"{"id":1,"jsonrpc":"2.0","result":"0x10"}"#),
    );
    let mut client = test_client(responses);
    let mut ctx = RequestContext::new(ContextKind::Rpc, request("eth_blockNumber"), 1);

    let result = client.send_context(&mut ctx).expect("succeeds");
    assert_eq!(result, vec![json!("0x10")]);
}

#[test]
fn server_error_blacklists_node_then_retry_succeeds() {
    let mut responses = HashMap::new();
    responses.insert("https://a.example".to_string(), Err("connection refused"));
    responses.insert(
        "https://b.example".to_string(),
        Ok(r#"{"id":1,"jsonrpc":"2.0","result":"0x20"}"#),
    );
    let mut client = test_client(responses);
    let mut ctx = RequestContext::new(ContextKind::Rpc, request("eth_blockNumber"), 1);

    let result = client.send_context(&mut ctx).expect("succeeds after retry");
    assert_eq!(result, vec![json!("0x20")]);

    let chain = client.chains.get(&1).expect("chain");
    assert!(chain
        .weights
        .get(&0)
        .expect("node 0 weight recorded")
        .is_blacklisted_at(1_000));
}

#[test]
fn user_error_rejects_node_in_context_only_without_persistent_blacklist() {
    let mut responses = HashMap::new();
    responses.insert(
        "https://a.example".to_string(),
        Ok(r#"{"id":1,"jsonrpc":"2.0","error":{"message":"Error: nonce too low"}}"#),
    );
    responses.insert(
        "https://b.example".to_string(),
        Ok(r#"{"id":1,"jsonrpc":"2.0","result":"0x30"}"#),
    );
    let mut client = test_client(responses);
    let mut ctx = RequestContext::new(ContextKind::Rpc, request("eth_sendRawTransaction"), 1);

    let result = client.send_context(&mut ctx).expect("succeeds via node b");
    assert_eq!(result, vec![json!("0x30")]);

    let chain = client.chains.get(&1).expect("chain");
    assert!(!chain
        .weights
        .get(&0)
        .map(|w| w.is_blacklisted_at(1_000))
        .unwrap_or(false));
}

#[test]
fn exhausting_every_node_surfaces_limit_error() {
    let mut responses = HashMap::new();
    responses.insert("https://a.example".to_string(), Err("boom"));
    responses.insert("https://b.example".to_string(), Err("boom"));
    responses.insert("https://c.example".to_string(), Err("boom"));
    let mut client = test_client(responses);
    client.config.max_attempts = 2;
    let mut ctx = RequestContext::new(ContextKind::Rpc, request("eth_blockNumber"), 1);

    let err = client.send_context(&mut ctx).expect_err("exhausted");
    assert_eq!(err, Error::Limit);
}

#[test]
fn node_list_method_is_ignored_not_limited_on_exhaustion() {
    let mut responses = HashMap::new();
    responses.insert("https://a.example".to_string(), Err("boom"));
    responses.insert("https://b.example".to_string(), Err("boom"));
    responses.insert("https://c.example".to_string(), Err("boom"));
    let mut client = test_client(responses);
    client.config.max_attempts = 1;
    let mut ctx = RequestContext::new(ContextKind::Rpc, request("in3_nodeList"), 1);

    let err = client.send_context(&mut ctx).expect_err("ignored");
    assert_eq!(err, Error::Ignore);
}

#[test]
fn verified_response_schedules_node_list_auto_update() {
    let mut responses = HashMap::new();
    responses.insert(
        "https://a.example".to_string(),
        Ok(r#"{"id":1,"jsonrpc":"2.0","result":"0x10","in3":{"lastNodeList":50,"currentBlock":40}}"#),
    );
    let mut client = test_client(responses);
    let mut ctx = RequestContext::new(ContextKind::Rpc, request("eth_blockNumber"), 1);

    client.send_context(&mut ctx).expect("succeeds");

    let chain = client.chains.get(&1).expect("chain");
    let pending = chain.pending_update.as_ref().expect("scheduled");
    assert_eq!(pending.exp_last_block, 50);
}

#[test]
fn sign_context_round_trips_through_signer() {
    let mut client = test_client(HashMap::new());
    let sign_request = SignRequest {
        message: b"hello".to_vec(),
        account: [1u8; 20],
        kind: SignKind::Hash,
    };
    let expected_digest = sign_request.digest();

    let signature = client.sign(sign_request, 1).expect("signs");
    assert_eq!(&signature[..32], &expected_digest[..]);
}

#[test]
fn verifier_context_exposes_in3_fields() {
    let chain = Chain::new(1, ChainType::Generic, [0u8; 20]);
    let request = json!([]);
    let result = json!("0x1");
    let mut verifier = TrustingVerifier;
    let mut parent = RequestContext::new(ContextKind::Rpc, request_with_method("eth_blockNumber"), 1);
    let vctx = VerifierContext {
        chain: &chain,
        request: &request,
        result: Some(&result),
        last_validator_change: None,
        current_block: Some(42),
        proof: None,
    };
    assert!(matches!(verifier.verify(&mut parent, &vctx), VerifyStatus::Ok));
}

fn request_with_method(method: &str) -> Vec<RequestSpec> {
    vec![RequestSpec::new(RequestId::Int(1), method, Value::Null)]
}
