use crate::client::BlueskyClient;
use bskycore::api;
use bskycore::convert::make_event_sender;
use bskycore::ids::{PortalId, UserId, parse_portal_id, parse_user_id};
use bskycore::net::HttpRequest;
use bskycore::types::chat::{
    Avatar, ChatInfo, ChatMember, ChatMemberList, MutedUntil, RoomType, UserInfo,
    UserLocalPortalInfo,
};
use bskycore::xrpc::XrpcError;
use bskyproto::chat::ConvoView;
use log::error;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatInfoError {
    #[error("failed to parse ghost ID {0}")]
    InvalidUserId(UserId),
    #[error(transparent)]
    Xrpc(#[from] XrpcError),
    #[error("failed to fetch avatar: {0}")]
    AvatarRequest(#[source] anyhow::Error),
    #[error("avatar download returned HTTP {0}")]
    AvatarStatus(u16),
}

pub(crate) fn user_identifiers(did: &str, handle: &str) -> Vec<String> {
    vec![did.to_string(), format!("bluesky:{handle}")]
}

pub fn wrap_avatar(url: &str) -> Avatar {
    Avatar::from_url(url)
}

impl BlueskyClient {
    pub async fn get_chat_info(&self, portal: &PortalId) -> Result<ChatInfo, ChatInfoError> {
        let resp = api::convo::get_convo(&self.chat_rpc, parse_portal_id(portal)).await?;
        Ok(self.wrap_chat_info(&resp.convo))
    }

    /// Builds the portal metadata for a conversation. Members whose DID
    /// can't be parsed are left out and the list is marked incomplete.
    pub fn wrap_chat_info(&self, convo: &ConvoView) -> ChatInfo {
        let mut members = ChatMemberList {
            is_full: true,
            total_member_count: convo.members.len(),
            members: BTreeMap::new(),
        };
        for member in &convo.members {
            let sender = match make_event_sender(&member.did, &self.user_login.id) {
                Ok(sender) => sender,
                Err(e) => {
                    error!(
                        target: "Bluesky/ChatInfo",
                        "Failed to parse member DID {}: {e}", member.did
                    );
                    members.is_full = false;
                    continue;
                }
            };
            let display_name = member.display_name.as_deref().unwrap_or_default();
            let user_info = UserInfo {
                identifiers: user_identifiers(&member.did, &member.handle),
                name: Some(self.config.format_displayname(
                    display_name,
                    &member.handle,
                    &member.did,
                )),
                avatar: Some(wrap_avatar(member.avatar.as_deref().unwrap_or_default())),
            };
            members
                .members
                .insert(sender.sender.clone(), ChatMember { sender, user_info });
        }

        ChatInfo {
            members,
            user_local: UserLocalPortalInfo {
                muted_until: convo.muted.then_some(MutedUntil::Forever),
            },
            room_type: (convo.members.len() == 2).then_some(RoomType::Dm),
            can_backfill: true,
        }
    }

    pub async fn get_user_info(&self, user_id: &UserId) -> Result<UserInfo, ChatInfoError> {
        let did = parse_user_id(user_id)
            .ok_or_else(|| ChatInfoError::InvalidUserId(user_id.clone()))?;
        let profile = api::actor::get_profile(&self.xrpc, &did.to_string()).await?;
        Ok(UserInfo {
            identifiers: user_identifiers(&profile.did, &profile.handle),
            name: Some(self.config.format_displayname(
                profile.display_name.as_deref().unwrap_or_default(),
                &profile.handle,
                &profile.did,
            )),
            avatar: Some(wrap_avatar(profile.avatar.as_deref().unwrap_or_default())),
        })
    }

    /// Downloads avatar bytes with the session's user agent.
    pub async fn fetch_avatar(&self, avatar: &Avatar) -> Result<Vec<u8>, ChatInfoError> {
        let request =
            HttpRequest::get(avatar.id.clone()).with_header("User-Agent", self.xrpc.user_agent());
        let resp = self
            .xrpc
            .http()
            .execute(request)
            .await
            .map_err(ChatInfoError::AvatarRequest)?;
        if !resp.is_success() {
            return Err(ChatInfoError::AvatarStatus(resp.status_code));
        }
        Ok(resp.body)
    }
}
