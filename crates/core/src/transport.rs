// Path: crates/core/src/transport.rs
//! The Transport and per-slot response machinery shared by RPC and signing
//! contexts.

/// The state of a single response slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// No collaborator has completed this slot yet.
    Waiting,
    /// The collaborator completed successfully; `data` holds the payload.
    Ok,
    /// The collaborator failed; `data` holds a diagnostic message, if any.
    Error,
}

/// A single response slot. The core allocates these before handing the
/// collection to a collaborator; the collaborator owns writing into them
/// and flipping `state` away from `Waiting`.
#[derive(Debug, Clone)]
pub struct ResponseSlot {
    pub state: SlotState,
    pub data: Vec<u8>,
}

impl ResponseSlot {
    /// A freshly allocated, unfilled slot.
    pub fn waiting() -> Self {
        Self {
            state: SlotState::Waiting,
            data: Vec::new(),
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.state == SlotState::Waiting
    }
}

/// A batch transport request: the payload to post, the URLs to post it to,
/// and the timeout the transport must honour.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub urls: Vec<String>,
    pub payload: Vec<u8>,
    pub timeout_ms: u64,
}

/// Posts `request.payload` to every URL in `request.urls` and fills the
/// correspondingly-indexed slot in `slots`.
///
/// May complete synchronously (filling every slot before returning) or
/// asynchronously (leaving some slots `Waiting`, to be filled by a
/// previously-spawned background task before the next call); either way,
/// completion is only observed by the core when it next calls `execute`.
pub trait Transport: Send {
    fn send(&mut self, request: &TransportRequest, slots: &mut [ResponseSlot]);
}

/// Rewrites `https://` to `http://`, the compatibility knob for
/// `ClientConfig::http_only`.
pub fn downgrade_to_http(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("https://") {
        format!("http://{rest}")
    } else {
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downgrade_rewrites_scheme() {
        assert_eq!(downgrade_to_http("https://node.example"), "http://node.example");
        assert_eq!(downgrade_to_http("http://node.example"), "http://node.example");
    }
}
