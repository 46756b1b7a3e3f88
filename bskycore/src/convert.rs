use crate::ids::{DidError, UserLoginId, make_user_id_from_str, make_user_login_id};
use crate::types::events::EventSender;
use crate::types::message::{ConvertedMessage, MessageType};
use bskyproto::chat::MessageRef;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub const DELETED_MESSAGE_BODY: &str = "Deleted message";
pub const UNSUPPORTED_MESSAGE_BODY: &str = "Unsupported message";

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("no message view or deleted message view")]
    NoMessageView,
    #[error("failed to parse sender DID: {0}")]
    SenderDid(#[from] DidError),
    #[error("failed to parse sentAt {value:?}: {source}")]
    SentAt {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// The fields every message view carries, plus the view itself.
#[derive(Debug, Clone)]
pub struct MessageDetails<'a> {
    pub sender: EventSender,
    pub sent_at: DateTime<Utc>,
    pub msg_id: String,
    pub data: &'a MessageRef,
}

impl MessageDetails<'_> {
    pub fn stream_order(&self) -> i64 {
        self.sent_at.timestamp_millis()
    }
}

pub fn make_event_sender(user_did: &str, login: &UserLoginId) -> Result<EventSender, DidError> {
    let sender = make_user_id_from_str(user_did)?;
    Ok(EventSender {
        is_from_me: user_did == login.as_str(),
        sender_login: make_user_login_id(user_did),
        sender,
    })
}

pub fn parse_datetime(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc))
}

/// Extracts sender, timestamp and id from a present or deleted message view.
pub fn parse_message_details<'a>(
    message: &'a MessageRef,
    login: &UserLoginId,
) -> Result<MessageDetails<'a>, TranslateError> {
    let (sender_did, sent_at, msg_id) = match message {
        MessageRef::Message(view) => (&view.sender.did, &view.sent_at, &view.id),
        MessageRef::Deleted(view) => (&view.sender.did, &view.sent_at, &view.id),
        MessageRef::Unknown => return Err(TranslateError::NoMessageView),
    };
    let sender = make_event_sender(sender_did, login)?;
    let sent_at = parse_datetime(sent_at).map_err(|source| TranslateError::SentAt {
        value: sent_at.clone(),
        source,
    })?;
    Ok(MessageDetails {
        sender,
        sent_at,
        msg_id: msg_id.clone(),
        data: message,
    })
}

/// Maps a message view to its neutral form. Never fails: shapes this code
/// doesn't know become an "unsupported" notice.
pub fn convert_message(message: &MessageRef) -> ConvertedMessage {
    match message {
        MessageRef::Message(view) => ConvertedMessage::single(MessageType::Text, view.text.clone()),
        MessageRef::Deleted(_) => {
            ConvertedMessage::single(MessageType::Notice, DELETED_MESSAGE_BODY)
        }
        MessageRef::Unknown => {
            ConvertedMessage::single(MessageType::Notice, UNSUPPORTED_MESSAGE_BODY)
        }
    }
}
