// Path: crates/core/src/selector.rs
//! The Node Selector collaborator: chooses nodes honouring filters,
//! persistent blacklists, and in-context rejections.

use std::collections::HashSet;

use tmrpc_types::{Chain, Node, NodeProps};

use crate::error::{Error, Result};

/// Criteria a picked node must satisfy.
#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    /// Capability bits the node must have set.
    pub props: NodeProps,
    /// If non-empty, restrict the pick to these node addresses (a verifier's
    /// hint, e.g. "ask this specific node for the sibling RPC").
    pub hinted_addresses: Vec<[u8; 20]>,
}

/// Chooses `n` nodes from `chain` matching `filter`, excluding any node
/// whose index appears in `rejected` (a per-context rejection) or whose
/// persistent blacklist has not yet expired.
pub trait NodeSelector: Send {
    /// Picks up to `n` eligible nodes. Returns a `config` error if fewer
    /// than one node can be found (an empty chain, or every candidate
    /// blacklisted/rejected).
    fn pick(
        &mut self,
        chain: &Chain,
        n: usize,
        filter: &NodeFilter,
        rejected: &HashSet<u32>,
        now: u64,
    ) -> Result<Vec<Node>>;
}

/// The default selector: orders eligible nodes by (fewest prior responses,
/// lowest average latency) so that untested and fast nodes are preferred,
/// mirroring the original's weighting heuristic without reproducing its
/// exact scoring constants.
#[derive(Debug, Default)]
pub struct WeightedNodeSelector;

impl NodeSelector for WeightedNodeSelector {
    fn pick(
        &mut self,
        chain: &Chain,
        n: usize,
        filter: &NodeFilter,
        rejected: &HashSet<u32>,
        now: u64,
    ) -> Result<Vec<Node>> {
        let mut candidates: Vec<&Node> = chain
            .eligible_nodes(now)
            .into_iter()
            .filter(|node| !rejected.contains(&node.index))
            .filter(|node| node.props.contains(filter.props))
            .filter(|node| {
                filter.hinted_addresses.is_empty()
                    || filter.hinted_addresses.contains(&node.address)
            })
            .collect();

        if candidates.is_empty() {
            return Err(Error::Config("no eligible nodes for selection".into()));
        }

        candidates.sort_by(|a, b| {
            let wa = chain.weights.get(&a.index);
            let wb = chain.weights.get(&b.index);
            let avg = |w: Option<&tmrpc_types::NodeWeight>| match w {
                Some(w) if w.response_count > 0 => {
                    w.total_response_time as f64 / w.response_count as f64
                }
                _ => 0.0,
            };
            avg(wa)
                .partial_cmp(&avg(wb))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(candidates
            .into_iter()
            .take(n.max(1))
            .cloned()
            .collect())
    }
}
