use crate::user_login::UserLogin;
use bskycore::api;
use bskycore::config::Config;
use bskycore::convert::parse_datetime;
use bskycore::identity::IdentityResolver;
use bskycore::ids::{PortalKey, UserId, make_portal_id, parse_user_id};
use bskycore::jwt;
use bskycore::store::StoreError;
use bskycore::types::events::{ChatResync, EventMeta, LogContext, RemoteEvent};
use bskycore::types::state::{BridgeState, BridgeStateEvent, ERROR_TOKEN_REFRESH_FAILED};
use bskycore::xrpc::{AuthInfo, XrpcClient, XrpcError};
use bskyproto::chat::MessageRef;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Number of conversations requested when resyncing the inbox.
pub const INBOX_FETCH_LIMIT: i64 = 20;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("client is not logged in")]
    NotLoggedIn,
    #[error("failed to refresh session: {0}")]
    Refresh(#[source] XrpcError),
    #[error("DID changed from {old} to {new}")]
    DidChanged { old: String, new: String },
    #[error("failed to save refreshed login: {0}")]
    Save(#[source] StoreError),
    #[error("failed to list conversations: {0}")]
    FetchInbox(#[source] XrpcError),
}

/// Handle to the background sync task of one session.
pub(crate) struct RunningSyncTask {
    pub(crate) stop: CancellationToken,
    pub(crate) task: JoinHandle<()>,
}

/// An authenticated Bluesky session bound to one [`UserLogin`].
///
/// `xrpc` talks to the account's PDS directly; `chat_rpc` shares its
/// credentials but proxies requests to the chat service.
pub struct BlueskyClient {
    pub user_login: Arc<UserLogin>,
    pub(crate) config: Arc<Config>,
    pub(crate) xrpc: XrpcClient,
    pub(crate) chat_rpc: XrpcClient,
    pub(crate) identity_resolver: Arc<dyn IdentityResolver>,
    pub(crate) sync_task: Mutex<Option<RunningSyncTask>>,
}

impl BlueskyClient {
    pub(crate) fn new(
        user_login: Arc<UserLogin>,
        config: Arc<Config>,
        xrpc: XrpcClient,
        chat_rpc: XrpcClient,
        identity_resolver: Arc<dyn IdentityResolver>,
    ) -> Self {
        Self {
            user_login,
            config,
            xrpc,
            chat_rpc,
            identity_resolver,
            sync_task: Mutex::new(None),
        }
    }

    pub fn xrpc(&self) -> &XrpcClient {
        &self.xrpc
    }

    pub fn chat_rpc(&self) -> &XrpcClient {
        &self.chat_rpc
    }

    pub(crate) fn make_portal_key(&self, convo_id: &str) -> PortalKey {
        PortalKey {
            id: make_portal_id(convo_id),
            receiver: self.user_login.id.clone(),
        }
    }

    /// Verifies the stored credentials, resyncs the inbox and starts polling.
    ///
    /// A failed refresh is reported as a bridge state and leaves the session
    /// idle; there is no retry until the next `connect`.
    pub async fn connect(self: &Arc<Self>) {
        self.user_login
            .send_state(BridgeState::new(BridgeStateEvent::Connecting));
        if let Err(e) = self.refresh_token().await {
            error!(target: "Bluesky/Session", "Failed to refresh token: {e}");
            self.user_login.send_state(BridgeState::with_error(
                BridgeStateEvent::UnknownError,
                ERROR_TOKEN_REFRESH_FAILED,
            ));
            return;
        }
        if let Err(e) = self.fetch_inbox().await {
            error!(target: "Bluesky/Session", "Failed to fetch inbox during startup: {e}");
        }
        self.start_polling().await;
    }

    /// Rotates the token pair and follows handle or PDS changes.
    pub async fn refresh_token(&self) -> Result<(), SessionError> {
        let current = self.xrpc.auth().ok_or(SessionError::NotLoggedIn)?;
        let refresh_client = self.xrpc.detached(Some(AuthInfo {
            access_jwt: current.refresh_jwt.clone(),
            ..current.clone()
        }));
        let resp = api::server::refresh_session(&refresh_client)
            .await
            .map_err(SessionError::Refresh)?;
        if resp.status.is_some() || resp.active == Some(false) {
            debug!(
                target: "Bluesky/Session",
                "Refreshed session reports account status {:?} (active: {:?})",
                resp.status, resp.active
            );
        }

        let meta = self.user_login.metadata().await;
        if resp.did != meta.auth.did {
            return Err(SessionError::DidChanged {
                old: meta.auth.did,
                new: resp.did,
            });
        }

        let mut new_host = None;
        if let Some(doc) = &resp.did_doc {
            match self.identity_resolver.resolve(doc) {
                Ok(ident) => {
                    let pds_endpoint = ident.pds_endpoint();
                    if !pds_endpoint.is_empty() && meta.host != pds_endpoint {
                        debug!(
                            target: "Bluesky/Session",
                            "PDS endpoint changed from {} to {}", meta.host, pds_endpoint
                        );
                        new_host = Some(pds_endpoint.to_string());
                    }
                }
                Err(e) => warn!(target: "Bluesky/Session", "Failed to parse DID doc: {e}"),
            }
        }

        let auth = self
            .user_login
            .update(|login| {
                let auth = &mut login.metadata.auth;
                auth.access_jwt = resp.access_jwt.clone();
                auth.refresh_jwt = resp.refresh_jwt.clone();
                if resp.handle != auth.handle {
                    debug!(
                        target: "Bluesky/Session",
                        "Handle changed from {} to {}", auth.handle, resp.handle
                    );
                    auth.handle = resp.handle.clone();
                    login.remote_name = resp.handle.clone();
                    login.remote_profile.username = resp.handle.clone();
                }
                if let Some(host) = &new_host {
                    login.metadata.host = host.clone();
                }
                login.metadata.auth.clone()
            })
            .await;
        self.xrpc.set_auth(Some(auth));
        if let Some(host) = new_host {
            self.xrpc.set_host(host.clone());
            self.chat_rpc.set_host(host);
        }

        self.user_login.save().await.map_err(SessionError::Save)
    }

    /// Expiry of the current access token, read without verifying the
    /// signature. Unreadable tokens are assumed to last ten more minutes.
    pub fn next_access_token_expiry(&self) -> DateTime<Utc> {
        let now = Utc::now();
        match self.xrpc.auth() {
            Some(auth) => jwt::expiry_or_fallback(&auth.access_jwt, now),
            None => now + chrono::Duration::minutes(jwt::FALLBACK_EXPIRY_MINUTES),
        }
    }

    /// Queues a resync for every conversation on the first inbox page.
    pub async fn fetch_inbox(&self) -> Result<(), SessionError> {
        let chats = api::convo::list_convos(&self.chat_rpc, "", INBOX_FETCH_LIMIT)
            .await
            .map_err(SessionError::FetchInbox)?;
        debug!(target: "Bluesky/Session", "Fetched {} conversations", chats.convos.len());
        for convo in chats.convos {
            let latest_message_ts = convo
                .last_message
                .as_ref()
                .and_then(MessageRef::sent_at)
                .and_then(|sent_at| parse_datetime(sent_at).ok());
            let chat_info = self.wrap_chat_info(&convo);
            self.user_login
                .queue_remote_event(RemoteEvent::ChatResync(Box::new(ChatResync {
                    meta: EventMeta {
                        portal_key: self.make_portal_key(&convo.id),
                        sender: None,
                        create_portal: true,
                        timestamp: None,
                        stream_order: 0,
                        log_context: LogContext {
                            chat_id: convo.id.clone(),
                            ..Default::default()
                        },
                    },
                    chat_info,
                    latest_message_ts,
                    bundled_backfill_data: Some(convo),
                })));
        }
        Ok(())
    }

    /// Stops the sync loop, if any, and waits for it to exit.
    pub async fn disconnect(&self) {
        let running = self.sync_task.lock().await.take();
        if let Some(running) = running {
            running.stop.cancel();
            if let Err(e) = running.task.await {
                warn!(target: "Bluesky/Session", "Sync task ended abnormally: {e}");
            }
            info!(target: "Bluesky/Session", "Disconnected {}", self.user_login.id);
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.xrpc.is_authenticated()
    }

    /// Invalidates the session server-side. Failures are only logged.
    pub async fn logout_remote(&self) {
        if self.is_logged_in()
            && let Err(e) = api::server::delete_session(&self.xrpc).await
        {
            error!(target: "Bluesky/Session", "Failed to delete session: {e}");
        }
    }

    pub fn is_this_user(&self, user_id: &UserId) -> bool {
        match (self.xrpc.auth(), parse_user_id(user_id)) {
            (Some(auth), Some(did)) => did.to_string() == auth.did,
            _ => false,
        }
    }
}

impl std::fmt::Debug for BlueskyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlueskyClient")
            .field("user_login", &self.user_login.id)
            .field("xrpc", &self.xrpc)
            .field("chat_rpc", &self.chat_rpc)
            .finish()
    }
}
