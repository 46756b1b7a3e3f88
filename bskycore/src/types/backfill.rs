use crate::ids::{MessageId, PortalKey};
use crate::types::events::EventSender;
use crate::types::message::ConvertedMessage;
use bskyproto::chat::ConvoView;
use chrono::{DateTime, Utc};

/// A message already bridged; backfill only returns what comes after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorMessage {
    pub id: MessageId,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct FetchMessagesParams {
    pub portal: PortalKey,
    pub forward: bool,
    pub count: usize,
    pub anchor_message: Option<AnchorMessage>,
    /// The convo view a `ChatResync` carried, if the request follows one.
    pub bundled_data: Option<ConvoView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillMessage {
    pub converted: ConvertedMessage,
    pub sender: EventSender,
    pub id: MessageId,
    pub timestamp: DateTime<Utc>,
    pub stream_order: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchMessagesResponse {
    /// Oldest first.
    pub messages: Vec<BackfillMessage>,
    pub forward: bool,
    pub mark_read: bool,
}
