use crate::ids::UserId;
use crate::types::events::EventSender;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomType {
    Default,
    Dm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutedUntil {
    Forever,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLocalPortalInfo {
    pub muted_until: Option<MutedUntil>,
}

/// A remote avatar, identified by its URL. An empty URL means "remove".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Avatar {
    pub id: String,
    pub remove: bool,
}

impl Avatar {
    pub fn from_url(url: &str) -> Self {
        Self {
            id: url.to_string(),
            remove: url.is_empty(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub identifiers: Vec<String>,
    pub name: Option<String>,
    pub avatar: Option<Avatar>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMember {
    pub sender: EventSender,
    pub user_info: UserInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMemberList {
    pub is_full: bool,
    pub total_member_count: usize,
    pub members: BTreeMap<UserId, ChatMember>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatInfo {
    pub members: ChatMemberList,
    pub user_local: UserLocalPortalInfo,
    pub room_type: Option<RoomType>,
    pub can_backfill: bool,
}
