use crate::client::BlueskyClient;
use crate::connector::BlueskyConnector;
use bskycore::api;
use bskycore::identity::IdentityError;
use bskycore::ids::make_user_login_id;
use bskycore::store::{LoginStore, PersistedLogin, RemoteProfile, StoreError, UserLoginMetadata};
use bskycore::types::events::EventSink;
use bskycore::types::state::{BridgeState, BridgeStateEvent, BridgeStateSink};
use bskycore::xrpc::{AuthInfo, XrpcError};
use bskyproto::atproto::CreateSessionInput;
use log::{debug, error, info};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("failed to create session: {0}")]
    CreateSession(#[source] XrpcError),
    #[error("failed to parse DID doc: {0}")]
    DidDoc(#[from] IdentityError),
    #[error("failed to save new login: {0}")]
    Save(#[source] StoreError),
}

/// Result of a successful login: the live client plus the message shown to
/// the user.
#[derive(Debug)]
pub struct LoginComplete {
    pub client: Arc<BlueskyClient>,
    pub instructions: String,
}

/// Username/password login against a Bluesky entryway such as `bsky.social`.
pub struct PasswordLogin<'a> {
    connector: &'a BlueskyConnector,
    store: Arc<dyn LoginStore>,
    events: Arc<dyn EventSink>,
    bridge_state: Arc<dyn BridgeStateSink>,
}

impl<'a> PasswordLogin<'a> {
    pub(crate) fn new(
        connector: &'a BlueskyConnector,
        store: Arc<dyn LoginStore>,
        events: Arc<dyn EventSink>,
        bridge_state: Arc<dyn BridgeStateSink>,
    ) -> Self {
        Self {
            connector,
            store,
            events,
            bridge_state,
        }
    }

    /// Creates a session, persists the login and starts syncing it in the
    /// background. `identifier` is a handle or an email address.
    pub async fn submit(
        self,
        domain: &str,
        identifier: &str,
        password: &str,
    ) -> Result<LoginComplete, LoginError> {
        let entryway = format!("https://{domain}");
        let cli = self.connector.xrpc_client(entryway.clone());
        let resp = api::server::create_session(
            &cli,
            &CreateSessionInput {
                identifier: identifier.to_string(),
                password: password.to_string(),
                auth_factor_token: None,
            },
        )
        .await
        .map_err(LoginError::CreateSession)?;

        let pds_endpoint = match &resp.did_doc {
            Some(doc) => self
                .connector
                .identity_resolver
                .resolve(doc)?
                .pds_endpoint()
                .to_string(),
            None => String::new(),
        };
        let host = if pds_endpoint.is_empty() {
            entryway
        } else {
            debug!(target: "Bluesky/Login", "Login response contained PDS endpoint {pds_endpoint}");
            pds_endpoint
        };

        let record = PersistedLogin {
            id: make_user_login_id(&resp.did),
            remote_name: resp.handle.clone(),
            remote_profile: RemoteProfile {
                email: resp.email.clone().unwrap_or_default(),
                username: resp.handle.clone(),
            },
            metadata: UserLoginMetadata {
                host,
                auth: AuthInfo {
                    access_jwt: resp.access_jwt,
                    refresh_jwt: resp.refresh_jwt,
                    handle: resp.handle.clone(),
                    did: resp.did,
                },
                cursor: String::new(),
            },
        };
        self.store.save(&record).await.map_err(LoginError::Save)?;
        info!(target: "Bluesky/Login", "Logged in as {} ({})", record.remote_name, record.id);

        let client =
            self.connector
                .load_user_login(record, self.store, self.events, self.bridge_state);
        client
            .user_login
            .send_state(BridgeState::new(BridgeStateEvent::Connecting));
        let bg = client.clone();
        tokio::spawn(async move {
            if let Err(e) = bg.fetch_inbox().await {
                error!(target: "Bluesky/Login", "Failed to fetch inbox after login: {e}");
            }
            bg.start_polling().await;
        });

        Ok(LoginComplete {
            client,
            instructions: format!("Successfully logged in as {}", resp.handle),
        })
    }
}
