use crate::client::BlueskyClient;
use bskycore::api;
use bskycore::convert::{convert_message, parse_message_details};
use bskycore::ids::{make_message_id, parse_portal_id};
use bskycore::types::backfill::{BackfillMessage, FetchMessagesParams, FetchMessagesResponse};
use bskycore::xrpc::XrpcError;
use log::error;
use thiserror::Error;

/// Upper bound on messages requested per backfill call.
pub const MAX_BACKFILL_COUNT: usize = 100;

#[derive(Debug, Error)]
pub enum BackfillError {
    #[error("backward backfill is not yet supported")]
    BackwardNotSupported,
    #[error("failed to fetch messages: {0}")]
    GetMessages(#[from] XrpcError),
}

impl BlueskyClient {
    /// Fetches the newest messages of a portal that come after the anchor.
    pub async fn fetch_messages(
        &self,
        params: FetchMessagesParams,
    ) -> Result<FetchMessagesResponse, BackfillError> {
        if !params.forward {
            return Err(BackfillError::BackwardNotSupported);
        }
        let limit = params.count.min(MAX_BACKFILL_COUNT) as i64;
        let convo_id = parse_portal_id(&params.portal.id);
        let resp = api::convo::get_messages(&self.chat_rpc, convo_id, "", limit).await?;

        let mut messages = Vec::with_capacity(resp.messages.len());
        for msg in &resp.messages {
            let details = match parse_message_details(msg, &self.user_login.id) {
                Ok(details) => details,
                Err(e) => {
                    error!(target: "Bluesky/Backfill", "Failed to parse message details: {e}");
                    continue;
                }
            };
            if let Some(anchor) = &params.anchor_message
                && details.sent_at <= anchor.timestamp
            {
                continue;
            }
            messages.push(BackfillMessage {
                converted: convert_message(details.data),
                id: make_message_id(&params.portal.id, &details.msg_id),
                timestamp: details.sent_at,
                stream_order: details.stream_order(),
                sender: details.sender,
            });
        }
        // getMessages pages newest first.
        messages.reverse();
        messages.sort_by_key(|msg| msg.stream_order);

        let mark_read = params
            .bundled_data
            .as_ref()
            .is_some_and(|convo| convo.unread_count == 0);
        Ok(FetchMessagesResponse {
            messages,
            forward: true,
            mark_read,
        })
    }
}
