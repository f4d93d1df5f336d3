// Path: crates/core/src/reputation.rs
//! The Reputation & Blacklist Manager: folds latency samples and applies
//! timed blacklists.

use tmrpc_types::Chain;

/// Wall-clock duration a blacklist extension applies, from the event.
pub const BLACKLIST_DURATION_SECS: u64 = 24 * 3600;

/// Whether a node's failure is attributable to the server or to the caller.
///
/// A server fault extends the persistent blacklist; a user fault is an
/// in-context rejection only, identified by an RPC error message beginning
/// with the literal prefix `Error:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Server,
    User,
}

/// Classifies an RPC error message's fault, per the `Error:` prefix convention.
pub fn classify_message(message: &str) -> Fault {
    if message.starts_with("Error:") {
        Fault::User
    } else {
        Fault::Server
    }
}

/// Folds one latency sample (milliseconds) into `index`'s running average.
pub fn record_latency(chain: &mut Chain, index: u32, millis: u64) {
    chain.weight_mut(index).record_latency(millis);
}

/// Applies `fault` to `index`: a server fault extends the persistent
/// blacklist by [`BLACKLIST_DURATION_SECS`]; a user fault does nothing
/// persistent (the caller is responsible for the in-context rejection set).
pub fn apply_fault(chain: &mut Chain, index: u32, fault: Fault, now: u64) {
    if fault == Fault::Server {
        chain.weight_mut(index).blacklist_for(now, BLACKLIST_DURATION_SECS);
    }
}

/// Clears a node's persistent blacklist, as happens on full verification.
pub fn clear_blacklist(chain: &mut Chain, index: u32) {
    chain.weight_mut(index).clear_blacklist();
}
