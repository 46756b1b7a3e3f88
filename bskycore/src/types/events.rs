use crate::ids::{MessageId, PortalKey, UserId, UserLoginId};
use crate::types::chat::ChatInfo;
use crate::types::message::ConvertedMessage;
use bskyproto::chat::ConvoView;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Who sent a remote event, as seen from one login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSender {
    pub is_from_me: bool,
    pub sender_login: UserLoginId,
    pub sender: UserId,
}

/// Structured fields the delivery side attaches to its logs for an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogContext {
    pub chat_id: String,
    pub rev: Option<String>,
    pub message_id: Option<String>,
    pub sender_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMeta {
    pub portal_key: PortalKey,
    pub sender: Option<EventSender>,
    pub create_portal: bool,
    pub timestamp: Option<DateTime<Utc>>,
    /// Ordering key; milliseconds since the epoch of the remote send time.
    pub stream_order: i64,
    pub log_context: LogContext,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResync {
    pub meta: EventMeta,
    pub chat_info: ChatInfo,
    pub latest_message_ts: Option<DateTime<Utc>>,
    /// Handed back to backfill so it can decide whether to mark the chat read.
    pub bundled_backfill_data: Option<ConvoView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEvent {
    pub meta: EventMeta,
    pub id: MessageId,
    pub data: ConvertedMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RemoteEvent {
    ChatResync(Box<ChatResync>),
    Message(MessageEvent),
}

/// Ingress of the delivery framework. Implementations must not block.
pub trait EventSink: Send + Sync {
    fn queue_remote_event(&self, event: RemoteEvent);
}

impl<F> EventSink for F
where
    F: Fn(RemoteEvent) + Send + Sync,
{
    fn queue_remote_event(&self, event: RemoteEvent) {
        self(event)
    }
}

/// Forwards events into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    tx: mpsc::UnboundedSender<RemoteEvent>,
}

impl ChannelEventSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RemoteEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelEventSink {
    fn queue_remote_event(&self, event: RemoteEvent) {
        if self.tx.send(event).is_err() {
            log::warn!(target: "Events", "Event receiver dropped, discarding remote event");
        }
    }
}
