use crate::client::BlueskyClient;
use bskycore::convert::{convert_message, parse_message_details};
use bskycore::ids::{make_message_id, make_portal_id};
use bskycore::types::events::{EventMeta, LogContext, MessageEvent, RemoteEvent};
use bskyproto::chat::{LogEntry, LogMessageChange};
use log::{error, trace};

impl BlueskyClient {
    /// Dispatches one getLog entry. Only new messages produce events.
    pub fn handle_event(&self, entry: &LogEntry) {
        trace!(target: "Bluesky/Events", "Received event: {entry:?}");
        match entry {
            LogEntry::CreateMessage(change) => self.handle_new_message(change),
            LogEntry::BeginConvo(_)
            | LogEntry::LeaveConvo(_)
            | LogEntry::DeleteMessage(_)
            | LogEntry::Unknown => {}
        }
    }

    fn handle_new_message(&self, change: &LogMessageChange) {
        let details = match parse_message_details(&change.message, &self.user_login.id) {
            Ok(details) => details,
            Err(e) => {
                error!(
                    target: "Bluesky/Events",
                    "Failed to parse message details in {} at rev {}: {e}",
                    change.convo_id,
                    change.rev
                );
                return;
            }
        };
        let portal_id = make_portal_id(&change.convo_id);
        let event = MessageEvent {
            meta: EventMeta {
                portal_key: self.make_portal_key(&change.convo_id),
                log_context: LogContext {
                    chat_id: change.convo_id.clone(),
                    rev: Some(change.rev.clone()),
                    message_id: Some(details.msg_id.clone()),
                    sender_id: Some(details.sender.sender.to_string()),
                },
                create_portal: true,
                timestamp: Some(details.sent_at),
                stream_order: details.stream_order(),
                sender: Some(details.sender.clone()),
            },
            id: make_message_id(&portal_id, &details.msg_id),
            data: convert_message(details.data),
        };
        self.user_login.queue_remote_event(RemoteEvent::Message(event));
    }
}
