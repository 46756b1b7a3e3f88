use crate::client::{BlueskyClient, RunningSyncTask};
use bskycore::api;
use bskycore::store::StoreError;
use bskycore::types::state::{
    BridgeState, BridgeStateEvent, ERROR_POLL_FAILED, ERROR_TOKEN_REFRESH_FAILED,
};
use bskycore::xrpc::XrpcError;
use bskyproto::chat::LogEntry;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub const POLL_INTERVAL: Duration = Duration::from_secs(5);
/// How long before access-token expiry the loop refreshes it.
pub const REFRESH_LEAD_MINUTES: i64 = 2;
pub const REFRESH_RETRY_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum PollError {
    #[error("failed to fetch log: {0}")]
    GetLog(#[source] XrpcError),
    #[error("failed to save updated polling cursor: {0}")]
    SaveCursor(#[source] StoreError),
}

/// Tokio deadline for the refresh that should precede `expiry`. Deadlines
/// already in the past map to "now".
pub(crate) fn refresh_deadline(expiry: DateTime<Utc>) -> Instant {
    let lead = expiry - chrono::Duration::minutes(REFRESH_LEAD_MINUTES) - Utc::now();
    Instant::now() + lead.to_std().unwrap_or(Duration::ZERO)
}

impl BlueskyClient {
    /// Starts the sync loop, replacing any loop already running for this
    /// session. The old loop has fully exited before the new one is spawned.
    pub async fn start_polling(self: &Arc<Self>) {
        let mut slot = self.sync_task.lock().await;
        if let Some(old) = slot.take() {
            old.stop.cancel();
            if let Err(e) = old.task.await {
                error!(target: "Bluesky/Poll", "Previous sync task ended abnormally: {e}");
            }
        }
        let stop = CancellationToken::new();
        let task = tokio::spawn(self.clone().polling_loop(stop.clone()));
        *slot = Some(RunningSyncTask { stop, task });
    }

    async fn polling_loop(self: Arc<Self>, stop: CancellationToken) {
        let expiry = self.next_access_token_expiry();
        info!(
            target: "Bluesky/Poll",
            "Starting polling for {} (next token expiry {})", self.user_login.id, expiry
        );
        let mut ticker = tokio::time::interval_at(Instant::now() + POLL_INTERVAL, POLL_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let expiry_timer = tokio::time::sleep_until(refresh_deadline(expiry));
        tokio::pin!(expiry_timer);

        let mut is_erroring = true;
        loop {
            let polled = tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                res = self.poll_once() => res,
            };
            match polled {
                Err(e) => {
                    is_erroring = true;
                    error!(target: "Bluesky/Poll", "Failed to poll for messages: {e}");
                    self.user_login.send_state(BridgeState::with_error(
                        BridgeStateEvent::TransientDisconnect,
                        ERROR_POLL_FAILED,
                    ));
                }
                Ok(()) if is_erroring => {
                    is_erroring = false;
                    self.user_login
                        .send_state(BridgeState::new(BridgeStateEvent::Connected));
                }
                Ok(()) => {}
            }

            tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                _ = &mut expiry_timer => {
                    match self.refresh_token().await {
                        Ok(()) => {
                            let next_expiry = self.next_access_token_expiry();
                            debug!(
                                target: "Bluesky/Poll",
                                "Refreshed token, next expiry {next_expiry}"
                            );
                            expiry_timer.as_mut().reset(refresh_deadline(next_expiry));
                            self.user_login
                                .send_state(BridgeState::new(BridgeStateEvent::Connected));
                        }
                        Err(e) => {
                            error!(target: "Bluesky/Poll", "Failed to refresh token: {e}");
                            expiry_timer
                                .as_mut()
                                .reset(Instant::now() + REFRESH_RETRY_DELAY);
                            self.user_login.send_state(BridgeState::with_error(
                                BridgeStateEvent::UnknownError,
                                ERROR_TOKEN_REFRESH_FAILED,
                            ));
                        }
                    }
                }
                _ = ticker.tick() => {}
            }
        }
        debug!(target: "Bluesky/Poll", "Stopped polling for {}", self.user_login.id);
    }

    /// Fetches one page of the event log and dispatches it. The cursor only
    /// moves once every entry has been handed to the event sink.
    pub async fn poll_once(&self) -> Result<(), PollError> {
        let cursor = self.user_login.metadata().await.cursor;
        let resp = api::convo::get_log(&self.chat_rpc, &cursor)
            .await
            .map_err(PollError::GetLog)?;
        for raw in resp.logs {
            match serde_json::from_value::<LogEntry>(raw) {
                Ok(entry) => self.handle_event(&entry),
                Err(e) => warn!(target: "Bluesky/Poll", "Dropping undecodable log entry: {e}"),
            }
        }
        if let Some(next) = resp.cursor.filter(|next| *next != cursor) {
            self.user_login
                .update(|login| login.metadata.cursor = next)
                .await;
            self.user_login
                .save()
                .await
                .map_err(PollError::SaveCursor)?;
        }
        Ok(())
    }

    /// Whether a sync loop is currently registered for this session.
    pub async fn is_polling(&self) -> bool {
        self.sync_task
            .lock()
            .await
            .as_ref()
            .is_some_and(|running| !running.task.is_finished())
    }
}
