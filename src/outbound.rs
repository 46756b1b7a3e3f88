use crate::client::BlueskyClient;
use bskycore::api;
use bskycore::convert::parse_datetime;
use bskycore::ids::{
    DidError, MessageId, PortalId, UserId, make_message_id, make_user_id_from_str,
    parse_message_id, parse_portal_id,
};
use bskycore::types::message::MessageContent;
use bskycore::types::message::MessageType;
use bskycore::xrpc::XrpcError;
use bskyproto::chat::{MessageInput, SendMessageInput, UpdateReadInput};
use chrono::{DateTime, Utc};
use log::trace;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutboundError {
    #[error("unsupported message type {0}")]
    UnsupportedMessageType(MessageType),
    #[error(transparent)]
    Xrpc(#[from] XrpcError),
    #[error("failed to parse sentAt: {0}")]
    SentAt(#[source] chrono::ParseError),
    #[error("failed to parse sender DID: {0}")]
    SenderDid(#[source] DidError),
}

/// What the delivery side records for a message the bridge sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessageResponse {
    pub id: MessageId,
    pub sender_id: UserId,
    pub timestamp: DateTime<Utc>,
    pub stream_order: i64,
}

impl BlueskyClient {
    pub async fn handle_outbound_message(
        &self,
        portal: &PortalId,
        content: &MessageContent,
    ) -> Result<OutboundMessageResponse, OutboundError> {
        if !content.msg_type.is_text() {
            return Err(OutboundError::UnsupportedMessageType(
                content.msg_type.clone(),
            ));
        }
        let input = SendMessageInput {
            convo_id: parse_portal_id(portal).to_string(),
            message: MessageInput {
                text: content.body.clone(),
            },
        };
        let resp = api::convo::send_message(&self.chat_rpc, &input).await?;
        let sent_at = parse_datetime(&resp.sent_at).map_err(OutboundError::SentAt)?;
        let sender_id = make_user_id_from_str(&resp.sender.did).map_err(OutboundError::SenderDid)?;
        Ok(OutboundMessageResponse {
            id: make_message_id(portal, &resp.id),
            sender_id,
            timestamp: sent_at,
            stream_order: sent_at.timestamp_millis(),
        })
    }

    /// Marks a conversation read, up to `exact_message` when it decodes.
    pub async fn handle_read_receipt(
        &self,
        portal: &PortalId,
        exact_message: Option<&MessageId>,
    ) -> Result<(), OutboundError> {
        let message_id = exact_message
            .and_then(parse_message_id)
            .map(|(_, msg_id)| msg_id)
            .filter(|msg_id| !msg_id.is_empty());
        let input = UpdateReadInput {
            convo_id: parse_portal_id(portal).to_string(),
            message_id,
        };
        let resp = api::convo::update_read(&self.chat_rpc, &input).await?;
        trace!(target: "Bluesky/Outbound", "Read receipt bridged: {:?}", resp.convo.id);
        Ok(())
    }
}
