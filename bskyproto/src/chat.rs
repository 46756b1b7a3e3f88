use serde::{Deserialize, Deserializer, Serialize};

pub const MESSAGE_VIEW_TYPE: &str = "chat.bsky.convo.defs#messageView";
pub const DELETED_MESSAGE_VIEW_TYPE: &str = "chat.bsky.convo.defs#deletedMessageView";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageViewSender {
    pub did: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: String,
    pub rev: String,
    pub text: String,
    pub sender: MessageViewSender,
    pub sent_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facets: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedMessageView {
    pub id: String,
    pub rev: String,
    pub sender: MessageViewSender,
    pub sent_at: String,
}

/// The `messageView | deletedMessageView` union. Anything that isn't a
/// well-formed view of a known `$type`, including a missing tag, decodes into
/// [`MessageRef::Unknown`] instead of failing the surrounding response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "$type")]
pub enum MessageRef {
    #[serde(rename = "chat.bsky.convo.defs#messageView")]
    Message(MessageView),
    #[serde(rename = "chat.bsky.convo.defs#deletedMessageView")]
    Deleted(DeletedMessageView),
    Unknown,
}

#[derive(Deserialize)]
#[serde(tag = "$type")]
enum TaggedMessageRef {
    #[serde(rename = "chat.bsky.convo.defs#messageView")]
    Message(MessageView),
    #[serde(rename = "chat.bsky.convo.defs#deletedMessageView")]
    Deleted(DeletedMessageView),
}

impl<'de> Deserialize<'de> for MessageRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match serde_json::from_value(value) {
            Ok(TaggedMessageRef::Message(view)) => MessageRef::Message(view),
            Ok(TaggedMessageRef::Deleted(view)) => MessageRef::Deleted(view),
            Err(_) => MessageRef::Unknown,
        })
    }
}

impl MessageRef {
    pub fn sent_at(&self) -> Option<&str> {
        match self {
            MessageRef::Message(view) => Some(&view.sent_at),
            MessageRef::Deleted(view) => Some(&view.sent_at),
            MessageRef::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileViewBasic {
    pub did: String,
    pub handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvoView {
    pub id: String,
    pub rev: String,
    pub members: Vec<ProfileViewBasic>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<MessageRef>,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub unread_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogConvoChange {
    pub rev: String,
    pub convo_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogMessageChange {
    pub rev: String,
    pub convo_id: String,
    pub message: MessageRef,
}

/// One element of `chat.bsky.convo.getLog`'s `logs` array. The output keeps
/// entries as raw JSON so each one is decoded on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum LogEntry {
    #[serde(rename = "chat.bsky.convo.defs#logBeginConvo")]
    BeginConvo(LogConvoChange),
    #[serde(rename = "chat.bsky.convo.defs#logLeaveConvo")]
    LeaveConvo(LogConvoChange),
    #[serde(rename = "chat.bsky.convo.defs#logCreateMessage")]
    CreateMessage(LogMessageChange),
    #[serde(rename = "chat.bsky.convo.defs#logDeleteMessage")]
    DeleteMessage(LogMessageChange),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetLogOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(default)]
    pub logs: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListConvosOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(default)]
    pub convos: Vec<ConvoView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvoOutput {
    pub convo: ConvoView,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetMessagesOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(default)]
    pub messages: Vec<MessageRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageInput {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageInput {
    pub convo_id: String,
    pub message: MessageInput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReadInput {
    pub convo_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}
