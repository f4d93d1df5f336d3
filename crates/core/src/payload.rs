// Path: crates/core/src/payload.rs
//! The Payload Composer: serialises a batch JSON-RPC envelope with embedded
//! proof-request metadata, and computes the digest signed when the client
//! holds a key.

use serde_json::{json, Value};
use tmrpc_crypto::algorithms::hash::Keccak256Builder;
use tmrpc_types::PROTOCOL_VERSION;

/// A request id: carried from the caller if integer or string, otherwise a
/// monotonic per-process counter rendered as a decimal string.
#[derive(Debug, Clone)]
pub enum RequestId {
    Int(i64),
    Str(String),
}

impl RequestId {
    fn to_json(&self) -> Value {
        match self {
            RequestId::Int(i) => json!(i),
            RequestId::Str(s) => json!(s),
        }
    }

    /// The raw bytes fed to the signing digest: the decoded string's byte
    /// length for a string id, matching `d_string(t)`/`d_len(t)` in the
    /// original rather than the length of a re-rendered (quoted/escaped)
    /// JSON string.
    fn digest_bytes(&self) -> Vec<u8> {
        match self {
            RequestId::Int(i) => i.to_string().into_bytes(),
            RequestId::Str(s) => s.clone().into_bytes(),
        }
    }
}

/// A single request destined for the batch envelope.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub id: RequestId,
    pub method: String,
    pub params: Value,
}

impl RequestSpec {
    pub fn new(id: RequestId, method: impl Into<String>, params: Value) -> Self {
        Self {
            id,
            method: method.into(),
            params,
        }
    }
}

/// Whether a node is asked to accompany its result with a proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Never,
    Proof,
}

/// Proof-request metadata embedded as the `in3` sub-object of each request.
#[derive(Debug, Clone, Default)]
pub struct ProofConfig {
    pub verification: Option<Verification>,
    pub chain_id: Option<u64>,
    pub whitelist_contract: Option<[u8; 20]>,
    pub signature: Option<[u8; 65]>,
    pub finality: Option<u8>,
    pub latest_block: Option<u64>,
    pub signers: Vec<[u8; 20]>,
    pub include_code: bool,
    pub full_proof: bool,
    pub no_stats: bool,
    pub use_binary: bool,
    pub verified_hashes: Vec<String>,
}

impl ProofConfig {
    fn is_empty(&self) -> bool {
        self.verification.is_none() && self.signature.is_none()
    }

    /// `method` gates `includeCode`, which the original only ever sets on
    /// `eth_call` (`ctx_create_payload` in the original client).
    fn to_json(&self, method: &str) -> Value {
        let mut obj = serde_json::Map::new();
        obj.insert(
            "verification".to_string(),
            json!(match self.verification.unwrap_or(Verification::Never) {
                Verification::Never => "never",
                Verification::Proof => "proof",
            }),
        );
        obj.insert("version".to_string(), json!(PROTOCOL_VERSION));
        if let Some(chain_id) = self.chain_id {
            obj.insert("chainId".to_string(), json!(chain_id));
        }
        if let Some(contract) = self.whitelist_contract {
            obj.insert("whiteListContract".to_string(), json!(hex::encode(contract)));
        }
        if let Some(sig) = self.signature {
            obj.insert("sig".to_string(), json!(hex::encode(sig)));
        }
        if let Some(finality) = self.finality {
            obj.insert("finality".to_string(), json!(finality));
        }
        if let Some(latest_block) = self.latest_block {
            obj.insert("latestBlock".to_string(), json!(latest_block));
        }
        if !self.signers.is_empty() {
            obj.insert(
                "signers".to_string(),
                json!(self
                    .signers
                    .iter()
                    .map(hex::encode)
                    .collect::<Vec<_>>()),
            );
        }
        if self.include_code && method == "eth_call" {
            obj.insert("includeCode".to_string(), json!(true));
        }
        if self.full_proof {
            obj.insert("useFullProof".to_string(), json!(true));
        }
        if self.no_stats {
            obj.insert("noStats".to_string(), json!(true));
        }
        if self.use_binary {
            obj.insert("useBinary".to_string(), json!(true));
        }
        if !self.verified_hashes.is_empty() {
            obj.insert("verifiedHashes".to_string(), json!(self.verified_hashes));
        }
        Value::Object(obj)
    }
}

/// Serialises `requests` into the outbound batch byte string, embedding
/// `proof` (when supplied and non-empty) as each request's `in3` sub-object.
pub fn compose_batch(requests: &[RequestSpec], proof: Option<&ProofConfig>) -> Vec<u8> {
    let array: Vec<Value> = requests
        .iter()
        .map(|request| {
            let mut obj = serde_json::Map::new();
            obj.insert("id".to_string(), request.id.to_json());
            obj.insert("jsonrpc".to_string(), json!("2.0"));
            obj.insert("method".to_string(), json!(request.method));
            obj.insert("params".to_string(), request.params.clone());
            if let Some(proof) = proof {
                if !proof.is_empty() {
                    obj.insert("in3".to_string(), proof.to_json(&request.method));
                }
            }
            Value::Object(obj)
        })
        .collect();
    // serde_json::Value serialization never fails for values built from
    // valid UTF-8 strings and finite JSON types.
    serde_json::to_vec(&Value::Array(array)).unwrap_or_default()
}

/// Computes the signing digest for one request: a streaming Keccak-256 over
/// the id, the method, and every leaf scalar of `params`, walked in
/// document order. Arrays and objects are recursed into; `null` leaves
/// contribute nothing.
pub fn request_digest(id: &RequestId, method: &str, params: &Value) -> [u8; 32] {
    let mut builder = Keccak256Builder::new();
    builder.update(&id.digest_bytes());
    builder.update(method.as_bytes());
    walk_params(params, &mut builder);
    builder.finalize()
}

fn walk_params(value: &Value, builder: &mut Keccak256Builder) {
    match value {
        Value::Null => {}
        Value::Bool(b) => builder.update(if *b { b"true" } else { b"false" }),
        Value::Number(n) => builder.update(n.to_string().as_bytes()),
        Value::String(s) => builder.update(s.as_bytes()),
        Value::Array(items) => {
            for item in items {
                walk_params(item, builder);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                walk_params(item, builder);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_batch_embeds_in3_when_proof_requested() {
        let requests = vec![RequestSpec::new(
            RequestId::Int(3),
            "eth_blockNumber",
            json!([]),
        )];
        let proof = ProofConfig {
            verification: Some(Verification::Proof),
            finality: Some(6),
            ..Default::default()
        };
        let bytes = compose_batch(&requests, Some(&proof));
        let parsed: Value = serde_json::from_slice(&bytes).expect("valid json");
        let entry = &parsed[0];
        assert_eq!(entry["id"], json!(3));
        assert_eq!(entry["method"], json!("eth_blockNumber"));
        assert_eq!(entry["in3"]["verification"], json!("proof"));
        assert_eq!(entry["in3"]["finality"], json!(6));
    }

    #[test]
    fn compose_batch_gates_include_code_on_eth_call() {
        let requests = vec![
            RequestSpec::new(RequestId::Int(1), "eth_call", json!([])),
            RequestSpec::new(RequestId::Int(2), "eth_blockNumber", json!([])),
        ];
        let proof = ProofConfig {
            verification: Some(Verification::Proof),
            include_code: true,
            ..Default::default()
        };
        let bytes = compose_batch(&requests, Some(&proof));
        let parsed: Value = serde_json::from_slice(&bytes).expect("valid json");
        assert_eq!(parsed[0]["in3"]["includeCode"], json!(true));
        assert!(parsed[1]["in3"].get("includeCode").is_none());
    }

    #[test]
    fn compose_batch_omits_in3_when_no_proof_and_no_signature() {
        let requests = vec![RequestSpec::new(RequestId::Int(1), "eth_chainId", json!([]))];
        let bytes = compose_batch(&requests, None);
        let parsed: Value = serde_json::from_slice(&bytes).expect("valid json");
        assert!(parsed[0].get("in3").is_none());
    }

    #[test]
    fn digest_is_deterministic() {
        let params = json!(["0x1", {"a": 1, "b": [2, null, "x"]}]);
        let a = request_digest(&RequestId::Int(1), "eth_call", &params);
        let b = request_digest(&RequestId::Int(1), "eth_call", &params);
        assert_eq!(a, b);
    }

    #[test]
    fn string_id_digest_uses_raw_byte_length_not_json_escaped_length() {
        // An id containing a quote would need escaping if re-rendered as
        // JSON; the digest must use the raw decoded byte length instead.
        let id = RequestId::Str("a\"b".to_string());
        let digest = request_digest(&id, "m", &json!([]));
        let mut builder = Keccak256Builder::new();
        builder.update(b"a\"b");
        builder.update(b"m");
        assert_eq!(digest, builder.finalize());
    }

    #[test]
    fn null_leaves_contribute_nothing() {
        let with_null = request_digest(&RequestId::Int(1), "m", &json!([1, null]));
        let without_null = request_digest(&RequestId::Int(1), "m", &json!([1]));
        assert_eq!(with_null, without_null);
    }
}
