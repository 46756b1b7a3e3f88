use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of event a converted part becomes on the delivery side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    Message,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    Text,
    Notice,
    Emote,
    Image,
    Video,
    Audio,
    File,
    Other(String),
}

impl MessageType {
    pub fn as_str(&self) -> &str {
        match self {
            MessageType::Text => "m.text",
            MessageType::Notice => "m.notice",
            MessageType::Emote => "m.emote",
            MessageType::Image => "m.image",
            MessageType::Video => "m.video",
            MessageType::Audio => "m.audio",
            MessageType::File => "m.file",
            MessageType::Other(other) => other,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(
            self,
            MessageType::Text | MessageType::Notice | MessageType::Emote
        )
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContent {
    pub msg_type: MessageType,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertedMessagePart {
    pub part_type: EventType,
    pub content: MessageContent,
}

/// A message in neither the remote nor the delivery protocol's shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertedMessage {
    pub parts: Vec<ConvertedMessagePart>,
}

impl ConvertedMessage {
    pub fn single(msg_type: MessageType, body: impl Into<String>) -> Self {
        Self {
            parts: vec![ConvertedMessagePart {
                part_type: EventType::Message,
                content: MessageContent {
                    msg_type,
                    body: body.into(),
                },
            }],
        }
    }
}
