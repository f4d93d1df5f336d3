// Path: crates/core/src/cache.rs
//! The persistent key-value Cache collaborator and the binary wire format
//! for node-list and whitelist records.

use tmrpc_types::{Chain, Node, NodeProps, NodeWeight, Whitelist, CACHE_VERSION};

use crate::error::{Error, Result};

/// A key-value store the core reads node lists and whitelists from, and
/// writes them back to after each execution wave. Implementations may back
/// this with a file, a database, or nothing at all (the core tolerates a
/// miss as a cold start).
pub trait Cache: Send {
    fn load(&self, key: &str) -> Option<Vec<u8>>;
    fn store(&mut self, key: &str, data: Vec<u8>);
}

/// The cache key a chain's node list is stored under.
pub fn nodelist_key(chain_id: u64) -> String {
    format!("nodelist_{chain_id}")
}

/// The chain+contract-scoped variant of the node-list key.
pub fn nodelist_contract_key(chain_id: u64, contract: &[u8; 20]) -> String {
    format!("nodelist_{chain_id}_0x{}", hex::encode(contract))
}

fn write_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn write_u64(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn write_bytes20(out: &mut Vec<u8>, v: &[u8; 20]) {
    out.extend_from_slice(v);
}

fn write_chars(out: &mut Vec<u8>, s: &str) {
    write_u32(out, s.len() as u32);
    out.extend_from_slice(s.as_bytes());
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| Error::InvalidData("cache record truncated".into()))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        let slice = self.take(4)?;
        Ok(u32::from_be_bytes(slice.try_into().unwrap_or([0; 4])))
    }

    fn u64(&mut self) -> Result<u64> {
        let slice = self.take(8)?;
        Ok(u64::from_be_bytes(slice.try_into().unwrap_or([0; 8])))
    }

    fn bytes20(&mut self) -> Result<[u8; 20]> {
        let slice = self.take(20)?;
        let mut out = [0u8; 20];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn chars(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        let slice = self.take(len)?;
        String::from_utf8(slice.to_vec())
            .map_err(|_| Error::InvalidData("cache record has invalid utf-8".into()))
    }
}

/// Encodes `chain`'s node list and weights in node-index order: version
/// byte, 20-byte contract, 8-byte last block, 4-byte node count, the packed
/// weights table, then the per-node records — `bb_write_int`/
/// `bb_write_long`/`bb_write_fixed_bytes`/`bb_write_chars` order.
pub fn encode_nodelist(chain: &Chain) -> Vec<u8> {
    let mut nodes: Vec<&Node> = chain.nodes.values().collect();
    nodes.sort_by_key(|n| n.index);

    let mut out = Vec::new();
    out.push(CACHE_VERSION);
    write_bytes20(&mut out, &chain.registry);
    write_u64(&mut out, chain.node_list_update.last_block);
    write_u32(&mut out, nodes.len() as u32);

    for node in &nodes {
        let weight = chain.weights.get(&node.index).cloned().unwrap_or_default();
        write_u32(&mut out, weight.response_count);
        write_u64(&mut out, weight.total_response_time);
        write_u64(&mut out, weight.blacklisted_until);
    }

    for node in &nodes {
        write_u32(&mut out, node.capacity);
        write_u32(&mut out, node.index);
        write_u64(&mut out, node.deposit);
        write_u64(&mut out, node.props.bits());
        write_bytes20(&mut out, &node.address);
        write_chars(&mut out, &node.url);
        out.push(node.whitelisted as u8);
    }

    out
}

/// Decoded node-list record: the registry contract, last block, nodes, and
/// weights, ready to be installed onto a [`Chain`].
pub struct DecodedNodeList {
    pub registry: [u8; 20],
    pub last_block: u64,
    pub nodes: Vec<Node>,
    pub weights: Vec<(u32, NodeWeight)>,
}

/// Decodes a node-list record written by [`encode_nodelist`]. Returns
/// `Err(Error::Version)` if the leading version byte does not match
/// [`CACHE_VERSION`], per "a version mismatch discards the cached entry
/// silently" — callers should treat that variant as a cache miss.
pub fn decode_nodelist(bytes: &[u8]) -> Result<DecodedNodeList> {
    let mut reader = Reader::new(bytes);
    let version = reader.u8()?;
    if version != CACHE_VERSION {
        return Err(Error::Version);
    }
    let registry = reader.bytes20()?;
    let last_block = reader.u64()?;
    let node_count = reader.u32()? as usize;

    let mut weight_rows = Vec::with_capacity(node_count);
    for _ in 0..node_count {
        let response_count = reader.u32()?;
        let total_response_time = reader.u64()?;
        let blacklisted_until = reader.u64()?;
        weight_rows.push(NodeWeight {
            response_count,
            total_response_time,
            blacklisted_until,
        });
    }

    let mut nodes = Vec::with_capacity(node_count);
    let mut weights = Vec::with_capacity(node_count);
    for weight in weight_rows {
        let capacity = reader.u32()?;
        let index = reader.u32()?;
        let deposit = reader.u64()?;
        let props_bits = reader.u64()?;
        let address = reader.bytes20()?;
        let url = reader.chars()?;
        let whitelisted = reader.u8()? != 0;
        nodes.push(Node {
            address,
            url,
            props: NodeProps::from_bits_truncate(props_bits),
            capacity,
            index,
            deposit,
            whitelisted,
        });
        weights.push((index, weight));
    }

    Ok(DecodedNodeList {
        registry,
        last_block,
        nodes,
        weights,
    })
}

/// Encodes a whitelist record: version byte, 20-byte whitelist contract
/// (all zero if none is configured), node count, and the packed address
/// list — the layout `in3_cache_store_whitelist` writes.
pub fn encode_whitelist(whitelist: &Whitelist) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(CACHE_VERSION);
    write_bytes20(&mut out, &whitelist.contract);
    write_u32(&mut out, whitelist.addresses.len() as u32);
    for address in &whitelist.addresses {
        write_bytes20(&mut out, address);
    }
    out
}

/// Decodes a whitelist record written by [`encode_whitelist`].
/// `last_block` is not part of the wire record (the original stores it
/// alongside the node-list's `last_block`); callers set it separately.
pub fn decode_whitelist(bytes: &[u8]) -> Result<Whitelist> {
    let mut reader = Reader::new(bytes);
    let version = reader.u8()?;
    if version != CACHE_VERSION {
        return Err(Error::Version);
    }
    let contract = reader.bytes20()?;
    let count = reader.u32()? as usize;
    let mut addresses = Vec::with_capacity(count);
    for _ in 0..count {
        addresses.push(reader.bytes20()?);
    }
    Ok(Whitelist {
        contract,
        last_block: 0,
        addresses,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tmrpc_types::ChainType;

    fn sample_chain() -> Chain {
        let mut chain = Chain::new(1, ChainType::Ethereum, [1u8; 20]);
        chain.node_list_update.last_block = 42;
        chain.nodes.insert(
            0,
            Node {
                address: [2u8; 20],
                url: "https://node0.example".to_string(),
                props: NodeProps::DATA | NodeProps::PROOF,
                capacity: 10,
                index: 0,
                deposit: 5000,
                whitelisted: true,
            },
        );
        chain.weight_mut(0).record_latency(120);
        chain
    }

    #[test]
    fn nodelist_round_trip() {
        let chain = sample_chain();
        let encoded = encode_nodelist(&chain);
        let decoded = decode_nodelist(&encoded).expect("decode");

        assert_eq!(decoded.registry, chain.registry);
        assert_eq!(decoded.last_block, 42);
        assert_eq!(decoded.nodes.len(), 1);
        assert_eq!(decoded.nodes[0].url, "https://node0.example");
        assert_eq!(decoded.weights[0].1.response_count, 1);
        assert_eq!(decoded.weights[0].1.total_response_time, 120);
    }

    #[test]
    fn nodelist_version_mismatch_is_rejected() {
        let mut encoded = encode_nodelist(&sample_chain());
        encoded[0] = CACHE_VERSION.wrapping_add(1);
        assert!(matches!(decode_nodelist(&encoded), Err(Error::Version)));
    }

    #[test]
    fn whitelist_round_trip() {
        let whitelist = Whitelist {
            contract: [9u8; 20],
            last_block: 7,
            addresses: vec![[1u8; 20], [2u8; 20]],
        };
        let encoded = encode_whitelist(&whitelist);
        let decoded = decode_whitelist(&encoded).expect("decode");
        assert_eq!(decoded.contract, whitelist.contract);
        assert_eq!(decoded.addresses, whitelist.addresses);
    }
}
