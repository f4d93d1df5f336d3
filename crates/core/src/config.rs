// Path: crates/core/src/config.rs
//! Process-wide client configuration.

use tmrpc_crypto::sign::secp256k1::Secp256k1KeyPair;

/// The node-list RPC method name, the sole member of the "allowed to fail"
/// set: when its attempt budget is exhausted, `Execute` surfaces `ignore`
/// rather than `limit`, letting the caller continue with a stale list.
pub const NODE_LIST_METHOD: &str = "in3_nodeList";

/// Process-wide client configuration: active chain, quorum sizes, proof and
/// compatibility flags, and the optional signing key.
pub struct ClientConfig {
    /// Chain id new contexts are created against by default.
    pub chain_id: u64,
    /// Number of nodes picked per attempt (quorum size).
    pub request_count: usize,
    /// Maximum number of attempts (pick → send → match cycles) before giving up.
    pub max_attempts: u32,
    /// Number of additional signer-capable nodes to ask for signatures.
    pub signature_count: usize,
    /// Whether proofs are requested at all.
    pub proof_requested: bool,
    /// Request `useFullProof:true`.
    pub full_proof: bool,
    /// Refresh the node list automatically from piggy-backed hints.
    pub auto_update_list: bool,
    /// Request `includeCode:true` for `eth_call`.
    pub include_code: bool,
    /// Request `noStats:true` (omit usage statistics from the node).
    pub no_stats: bool,
    /// Request `useBinary:true` (binary proof encoding).
    pub use_binary: bool,
    /// Rewrite outbound `https://` URLs to `http://` (HTTP-only compatibility knob).
    pub http_only: bool,
    /// Transport timeout, in milliseconds.
    pub timeout_ms: u64,
    /// Finality depth to request, if any.
    pub finality: Option<u8>,
    /// `latestBlock` depth to request, if any.
    pub latest_block: Option<u64>,
    /// The client's own request-signing key, if configured.
    pub signing_key: Option<Secp256k1KeyPair>,
}

impl ClientConfig {
    /// Defaults matching the original client's compile-time constants:
    /// a single-node quorum, five attempts, no signatures, proofs requested,
    /// auto-update enabled, a five-second transport timeout.
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            request_count: 1,
            max_attempts: 5,
            signature_count: 0,
            proof_requested: true,
            full_proof: false,
            auto_update_list: true,
            include_code: false,
            no_stats: false,
            use_binary: false,
            http_only: false,
            timeout_ms: 5_000,
            finality: None,
            latest_block: None,
            signing_key: None,
        }
    }
}
