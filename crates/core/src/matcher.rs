// Path: crates/core/src/matcher.rs
//! The Response Matcher and Verifier Dispatch (§4.F): folds raw transport
//! responses into latency samples, blacklist decisions, and a verified
//! result, or decides the whole wave must be retried.

use serde_json::Value;

use crate::autoupdate::{self, AutoUpdateHint};
use crate::client::Client;
use crate::context::{ExecStatus, RequestContext, VerificationState};
use crate::error::Error;
use crate::reputation::{self, Fault};
use crate::transport::SlotState;
use crate::verifier::{VerifierContext, VerifyStatus};

/// Walks `ctx`'s picked nodes in selection order, looking for the first one
/// whose response is both well-formed and fully verified. Blacklists or
/// rejects every node it passes over along the way.
pub fn match_responses(ctx: &mut RequestContext, client: &mut Client, now: u64) -> ExecStatus {
    let chain_type = match client.chains.get(&ctx.chain_id) {
        Some(chain) => chain.chain_type,
        None => return ExecStatus::Error(Error::NotFound(format!("chain {}", ctx.chain_id))),
    };

    let request_count = ctx.requests.len();
    let picked: Vec<(u32, usize, [u8; 20])> = ctx
        .picked_nodes
        .iter()
        .enumerate()
        .map(|(slot_idx, node)| (node.index, slot_idx, node.address))
        .collect();

    let mut any_pending = false;

    for (node_index, slot_idx, node_address) in picked {
        if ctx.raw_responses[slot_idx].is_waiting() {
            any_pending = true;
            continue;
        }

        let latency = 0u64; // transports do not currently report per-call latency.
        if let Some(chain) = client.chains.get_mut(&ctx.chain_id) {
            reputation::record_latency(chain, node_index, latency);
        }

        if ctx.raw_responses[slot_idx].state == SlotState::Error {
            if !ctx.rejected_in_context.contains(&node_index) {
                if let Some(chain) = client.chains.get_mut(&ctx.chain_id) {
                    reputation::apply_fault(chain, node_index, Fault::Server, now);
                }
            }
            let message = String::from_utf8_lossy(&ctx.raw_responses[slot_idx].data).to_string();
            let message = if message.is_empty() {
                "no response from node".to_string()
            } else {
                message
            };
            ctx.error = Some(Error::Rpc(message));
            continue;
        }

        let body = ctx.raw_responses[slot_idx].data.clone();
        let looks_json = body.first().map(|b| *b == b'{' || *b == b'[').unwrap_or(false);
        if !looks_json {
            if let Some(chain) = client.chains.get_mut(&ctx.chain_id) {
                reputation::apply_fault(chain, node_index, Fault::Server, now);
            }
            ctx.error = Some(Error::InvalidData(
                "binary response bodies are not supported".to_string(),
            ));
            continue;
        }

        let parsed: Value = match serde_json::from_slice(&body) {
            Ok(v) => v,
            Err(_) => {
                if let Some(chain) = client.chains.get_mut(&ctx.chain_id) {
                    reputation::apply_fault(chain, node_index, Fault::Server, now);
                }
                ctx.error = Some(Error::InvalidData("malformed json response".to_string()));
                continue;
            }
        };

        let entries: Vec<Value> = match (&parsed, request_count) {
            (Value::Object(_), 1) => vec![parsed.clone()],
            (Value::Array(items), n) if items.len() == n => items.clone(),
            _ => {
                if let Some(chain) = client.chains.get_mut(&ctx.chain_id) {
                    reputation::apply_fault(chain, node_index, Fault::Server, now);
                }
                ctx.error = Some(Error::InvalidData(
                    "response shape does not match the request batch".to_string(),
                ));
                continue;
            }
        };

        let mut node_failed = false;
        let mut verified_results = Vec::with_capacity(request_count);
        let mut first_in3: Option<Value> = None;

        for (req_idx, entry) in entries.iter().enumerate() {
            let result = entry.get("result");
            if result.is_none() {
                let message = entry
                    .get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(Value::as_str)
                    .unwrap_or("unknown rpc error")
                    .to_string();
                let fault = reputation::classify_message(&message);
                if fault == Fault::User {
                    ctx.rejected_in_context.insert(node_index);
                } else if let Some(chain) = client.chains.get_mut(&ctx.chain_id) {
                    reputation::apply_fault(chain, node_index, fault, now);
                }
                ctx.error = Some(Error::Rpc(message));
                node_failed = true;
                break;
            }

            let in3 = entry.get("in3");
            if first_in3.is_none() {
                first_in3 = in3.cloned();
            }
            let last_validator_change = in3
                .and_then(|v| v.get("lastValidatorChange"))
                .and_then(Value::as_u64);
            let current_block = in3.and_then(|v| v.get("currentBlock")).and_then(Value::as_u64);
            let proof = in3.and_then(|v| v.get("proof"));
            let request_params = ctx
                .requests
                .get(req_idx)
                .map(|r| r.params.clone())
                .unwrap_or(Value::Null);

            let verdict = {
                let chain_ref = client.chains.get(&ctx.chain_id).expect("checked above");
                let vctx = VerifierContext {
                    chain: chain_ref,
                    request: &request_params,
                    result,
                    last_validator_change,
                    current_block,
                    proof,
                };
                let verifier = client
                    .verifiers
                    .get_mut(chain_type)
                    .expect("checked by caller");
                verifier.verify(ctx, &vctx)
            };

            match verdict {
                VerifyStatus::Ok => verified_results.push(result.cloned().unwrap_or(Value::Null)),
                VerifyStatus::Waiting => return ExecStatus::Waiting,
                VerifyStatus::Error(message) => {
                    if let Some(chain) = client.chains.get_mut(&ctx.chain_id) {
                        reputation::apply_fault(chain, node_index, Fault::Server, now);
                    }
                    ctx.error = Some(Error::Rpc(message));
                    node_failed = true;
                    break;
                }
            }
        }

        if node_failed {
            continue;
        }

        if let Some(chain) = client.chains.get_mut(&ctx.chain_id) {
            reputation::clear_blacklist(chain, node_index);
        }

        if client.config.auto_update_list {
            if let Some(in3) = first_in3 {
                let hint = AutoUpdateHint {
                    last_node_list: in3.get("lastNodeList").and_then(Value::as_u64),
                    current_block: in3.get("currentBlock").and_then(Value::as_u64),
                    last_whitelist: in3.get("lastWhiteList").and_then(Value::as_u64),
                    announcer: node_address,
                };
                if let Some(chain) = client.chains.get_mut(&ctx.chain_id) {
                    autoupdate::apply(chain, &hint, now);
                }
            }
        }

        ctx.error = None;
        ctx.verification_state = VerificationState::Ok;
        ctx.parsed_responses = Some(verified_results);
        return ExecStatus::Ok;
    }

    if any_pending {
        ctx.error = None;
        return ExecStatus::Waiting;
    }

    ExecStatus::Error(Error::InvalidData(
        "no node returned a valid, verified response".to_string(),
    ))
}
