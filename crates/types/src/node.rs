// Path: crates/types/src/node.rs
//! Node records and their mutable reputation ("weight").

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Capability/property bitfield advertised by a node and used to filter
    /// node-selection requests.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct NodeProps: u64 {
        /// Node serves data/state requests.
        const DATA      = 0b0000_0001;
        /// Node is reachable over plain HTTP (no TLS required).
        const HTTP      = 0b0000_0010;
        /// Node can produce cryptographic proofs alongside results.
        const PROOF     = 0b0000_0100;
        /// Node can act as an additional signer for request-signing quorums.
        const SIGNER    = 0b0000_1000;
        /// Node serves more than one chain and requires an explicit `chainId`.
        const MULTICHAIN = 0b0001_0000;
        /// Node is archival (keeps full historic state).
        const ARCHIVE   = 0b0010_0000;
    }
}

/// A single entry in a chain's node list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// 20-byte node operator address (as registered on the whitelist/staking contract).
    pub address: [u8; 20],
    /// The URL the transport will post requests to.
    pub url: String,
    /// Capability bitfield.
    pub props: NodeProps,
    /// Maximum number of parallel requests the node advertises it can serve.
    pub capacity: u32,
    /// Position of this node in the chain's on-chain registry, used as a
    /// stable handle independent of list reordering.
    pub index: u32,
    /// Stake/deposit backing this node, in the chain's native unit.
    pub deposit: u64,
    /// Whether the node appears on the chain's whitelist contract (if any).
    pub whitelisted: bool,
}

/// Mutable reputation attached to a [`Node`].
///
/// `blacklisted_until` is the persistent, cross-context exclusion; it is
/// distinct from a context-local rejection, which callers track separately
/// (see `tmrpc-core::nodelist::Picked`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeWeight {
    /// Number of responses this node has produced (used to compute
    /// `total_response_time / response_count` average latency).
    pub response_count: u32,
    /// Cumulative response time across `response_count` responses, in
    /// milliseconds.
    pub total_response_time: u64,
    /// Unix-seconds timestamp before which this node must not be picked
    /// again. `None`/`0` means not blacklisted.
    pub blacklisted_until: u64,
}

impl NodeWeight {
    /// True if `now` (unix seconds) is still within the blacklist window.
    pub fn is_blacklisted_at(&self, now: u64) -> bool {
        self.blacklisted_until > now
    }

    /// Extends the blacklist to `now + duration_secs`, the way the matcher
    /// does for a transport/parse failure or a server-fault RPC error.
    pub fn blacklist_for(&mut self, now: u64, duration_secs: u64) {
        self.blacklisted_until = now.saturating_add(duration_secs);
    }

    /// Resets the blacklist, the way a fully-verified response does.
    pub fn clear_blacklist(&mut self) {
        self.blacklisted_until = 0;
    }

    /// Folds one more latency sample into the running average, zeroing it
    /// so a later retry on the same context does not double-count it.
    pub fn record_latency(&mut self, millis: u64) {
        self.response_count = self.response_count.saturating_add(1);
        self.total_response_time = self.total_response_time.saturating_add(millis);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blacklist_window() {
        let mut w = NodeWeight::default();
        assert!(!w.is_blacklisted_at(100));
        w.blacklist_for(100, 86_400);
        assert!(w.is_blacklisted_at(100));
        assert!(w.is_blacklisted_at(100 + 86_399));
        assert!(!w.is_blacklisted_at(100 + 86_400));
    }

    #[test]
    fn clear_resets_to_zero() {
        let mut w = NodeWeight::default();
        w.blacklist_for(100, 86_400);
        w.clear_blacklist();
        assert_eq!(w.blacklisted_until, 0);
    }

    #[test]
    fn props_filter_intersection() {
        let node_props = NodeProps::DATA | NodeProps::PROOF;
        let filter = NodeProps::DATA | NodeProps::HTTP;
        assert!(!node_props.contains(filter));
        assert!(node_props.intersects(filter));
    }
}
