use serde::{Deserialize, Serialize};

pub const ERROR_TOKEN_REFRESH_FAILED: &str = "bsky-token-refresh-failed";
pub const ERROR_POLL_FAILED: &str = "bsky-poll-failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BridgeStateEvent {
    #[default]
    Connecting,
    Connected,
    TransientDisconnect,
    UnknownError,
}

/// A connectivity report, with a stable error code where one applies.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BridgeState {
    pub state_event: BridgeStateEvent,
    pub error: Option<String>,
}

impl BridgeState {
    pub fn new(state_event: BridgeStateEvent) -> Self {
        Self {
            state_event,
            error: None,
        }
    }

    pub fn with_error(state_event: BridgeStateEvent, error: impl Into<String>) -> Self {
        Self {
            state_event,
            error: Some(error.into()),
        }
    }
}

pub trait BridgeStateSink: Send + Sync {
    fn send_state(&self, state: BridgeState);
}

impl<F> BridgeStateSink for F
where
    F: Fn(BridgeState) + Send + Sync,
{
    fn send_state(&self, state: BridgeState) {
        self(state)
    }
}
