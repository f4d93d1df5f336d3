// Path: crates/core/src/autoupdate.rs
//! The Node-List Auto-Update Trigger: schedules node-list/whitelist
//! refreshes from piggy-backed hints in a verified response's `in3` section.

use tmrpc_types::{Chain, PendingNodeListUpdate};

/// Upper bound on the scheduled waittime, regardless of the formula's output.
pub const MAX_WAITTIME_SECS: u64 = 3600;

/// The subset of a verified response's `in3` section relevant to auto-update.
#[derive(Debug, Clone, Default)]
pub struct AutoUpdateHint {
    pub last_node_list: Option<u64>,
    pub current_block: Option<u64>,
    pub last_whitelist: Option<u64>,
    pub announcer: [u8; 20],
}

/// Applies `hint` to `chain`, per §4.H:
/// - ignores hints where `lastNodeList > currentBlock` (impossible, a
///   misreporting node),
/// - records a [`PendingNodeListUpdate`] when `lastNodeList` exceeds the
///   chain's currently loaded block, scheduled `waittime` seconds out,
/// - marks the whitelist as needing a refresh when `lastWhiteList` exceeds
///   the currently loaded whitelist block.
pub fn apply(chain: &mut Chain, hint: &AutoUpdateHint, now: u64) {
    if let (Some(last_node_list), Some(current_block)) = (hint.last_node_list, hint.current_block)
    {
        if last_node_list > current_block {
            return;
        }
        if last_node_list > chain.node_list_update.last_block {
            let waittime = waittime_secs(
                current_block,
                last_node_list,
                chain.replace_latest_block,
                chain.avg_block_time,
            );
            chain.pending_update = Some(PendingNodeListUpdate {
                announcer: hint.announcer,
                exp_last_block: last_node_list,
                scheduled_at: now.saturating_add(waittime),
            });
        }
    }

    if let Some(last_whitelist) = hint.last_whitelist {
        let current = chain.whitelist.as_ref().map(|w| w.last_block).unwrap_or(0);
        if last_whitelist > current {
            chain.whitelist_needs_update = true;
        }
    }
}

/// `waittime = 0` once the announced list is already `replace_latest_block`
/// blocks old; otherwise scales linearly with how many blocks remain,
/// capped at [`MAX_WAITTIME_SECS`].
fn waittime_secs(
    current_block: u64,
    last_node_list: u64,
    replace_latest_block: u64,
    avg_block_time: u64,
) -> u64 {
    let age = current_block.saturating_sub(last_node_list);
    if age >= replace_latest_block {
        return 0;
    }
    let remaining = replace_latest_block - age;
    (remaining * avg_block_time).min(MAX_WAITTIME_SECS)
}

/// Called when a node-list refresh fetch itself fails. If a pending update
/// descriptor already existed (i.e. this was not the very first refresh),
/// the announcing node is blacklisted and the descriptor cleared, so a
/// single bad node cannot force perpetual failed refreshes. Returns the
/// announcer's address when a blacklist should be applied.
pub fn on_refresh_failed(chain: &mut Chain) -> Option<[u8; 20]> {
    chain.pending_update.take().map(|pending| pending.announcer)
}
