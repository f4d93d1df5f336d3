// Path: crates/types/src/chain.rs
//! Chain configuration and node-list bookkeeping.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::node::{Node, NodeWeight};

/// Identifies which verification scheme a chain's proofs use.
///
/// Most chains are `Ethereum`-style (Merkle-Patricia proofs); a handful of
/// non-EVM chains use their own account/state proof formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainType {
    /// Ethereum and EVM-compatible chains (Merkle-Patricia state/receipt proofs).
    Ethereum,
    /// IPFS content lookups (no state proof, only content-addressing).
    Ipfs,
    /// Bitcoin and compatible chains (Merkle block proofs).
    Bitcoin,
    /// A chain whose proof format is not modelled; verification is skipped.
    Generic,
}

/// Describes when a chain's node list was last refreshed and when the next
/// refresh should be attempted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeListUpdate {
    /// Block number as of the last successful node-list fetch.
    pub last_block: u64,
    /// Unix-seconds timestamp of the last fetch attempt, successful or not.
    pub last_attempt: u64,
    /// True once at least one node-list fetch has completed and been
    /// verified; before this, a fetched list is trusted unconditionally
    /// because there is nothing yet to cross-check it against.
    pub trusted: bool,
}

/// A scheduled, not-yet-applied node-list refresh, recorded when a verified
/// response announces a newer node list than the one currently loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingNodeListUpdate {
    /// Address of the node whose response announced this update.
    pub announcer: [u8; 20],
    /// The node-list block the announcer claims is current.
    pub exp_last_block: u64,
    /// Unix-seconds timestamp before which the update must not be applied.
    pub scheduled_at: u64,
}

/// The set of addresses permitted to serve a chain, when the chain runs a
/// whitelist contract. `None` means any node backed by sufficient deposit is
/// eligible.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Whitelist {
    /// Contract address the whitelist was read from.
    pub contract: [u8; 20],
    /// Block number the whitelist was valid as of.
    pub last_block: u64,
    /// The permitted node addresses.
    pub addresses: Vec<[u8; 20]>,
}

/// A chain's full client-visible configuration: its id, proof scheme, node
/// registry contract, and the live node list plus per-node reputation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chain {
    /// Numeric chain id (e.g. 1 for Ethereum mainnet).
    pub chain_id: u64,
    /// Proof/verification scheme this chain uses.
    pub chain_type: ChainType,
    /// Address of the node-registry contract this chain's list was read from.
    pub registry: [u8; 20],
    /// Current node list, keyed by node `index` for O(1) lookup by the
    /// stable handle used elsewhere (blacklisting, signer selection).
    pub nodes: HashMap<u32, Node>,
    /// Per-node reputation, keyed the same way as `nodes`.
    pub weights: HashMap<u32, NodeWeight>,
    /// Node-list refresh bookkeeping.
    pub node_list_update: NodeListUpdate,
    /// Optional whitelist restricting which nodes may be picked.
    pub whitelist: Option<Whitelist>,
    /// Minimum number of proof-matching signatures required before a
    /// response is accepted (quorum size for signed responses).
    pub min_deposit: u64,
    /// Average block time in seconds, used by the auto-update waittime formula.
    pub avg_block_time: u64,
    /// Depth (in blocks) at which a reported block is considered final
    /// enough that a newer node list no longer needs to wait before being
    /// applied ("replace_latest_block" in the waittime formula).
    pub replace_latest_block: u64,
    /// A node-list refresh announced by a verified response but not yet
    /// applied, pending `scheduled_at`.
    pub pending_update: Option<PendingNodeListUpdate>,
    /// True once the whitelist has been marked as needing a refresh by a
    /// verified response carrying a newer `lastWhiteList`.
    pub whitelist_needs_update: bool,
}

impl Chain {
    /// Creates an empty chain configuration ready to receive a node list.
    pub fn new(chain_id: u64, chain_type: ChainType, registry: [u8; 20]) -> Self {
        Self {
            chain_id,
            chain_type,
            registry,
            nodes: HashMap::new(),
            weights: HashMap::new(),
            node_list_update: NodeListUpdate::default(),
            whitelist: None,
            min_deposit: 0,
            avg_block_time: 12,
            replace_latest_block: 6,
            pending_update: None,
            whitelist_needs_update: false,
        }
    }

    /// Returns the [`NodeWeight`] for `index`, creating a default one if this
    /// is the first time the node has been seen.
    pub fn weight_mut(&mut self, index: u32) -> &mut NodeWeight {
        self.weights.entry(index).or_default()
    }

    /// Nodes eligible to be picked right now: present in the registry and
    /// not currently blacklisted.
    pub fn eligible_nodes(&self, now: u64) -> Vec<&Node> {
        self.nodes
            .values()
            .filter(|n| {
                self.weights
                    .get(&n.index)
                    .map(|w| !w.is_blacklisted_at(now))
                    .unwrap_or(true)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeProps;

    fn sample_node(index: u32) -> Node {
        Node {
            address: [index as u8; 20],
            url: format!("https://node{index}.example"),
            props: NodeProps::DATA | NodeProps::PROOF,
            capacity: 10,
            index,
            deposit: 1000,
            whitelisted: true,
        }
    }

    #[test]
    fn eligible_nodes_excludes_blacklisted() {
        let mut chain = Chain::new(1, ChainType::Ethereum, [0u8; 20]);
        chain.nodes.insert(0, sample_node(0));
        chain.nodes.insert(1, sample_node(1));
        chain.weight_mut(1).blacklist_for(100, 86_400);

        let eligible = chain.eligible_nodes(100);
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].index, 0);
    }

    #[test]
    fn weight_mut_creates_default() {
        let mut chain = Chain::new(1, ChainType::Ethereum, [0u8; 20]);
        assert!(chain.weights.is_empty());
        chain.weight_mut(5);
        assert!(chain.weights.contains_key(&5));
    }
}
