use crate::client::BlueskyClient;
use crate::login::PasswordLogin;
use crate::user_login::UserLogin;
use bskycore::config::{Config, ConfigError};
use bskycore::identity::{DocumentResolver, IdentityResolver};
use bskycore::net::HttpClient;
use bskycore::store::{LoginStore, PersistedLogin};
use bskycore::types::events::EventSink;
use bskycore::types::state::BridgeStateSink;
use bskycore::xrpc::{ATPROTO_PROXY_HEADER, XrpcClient};
use std::sync::Arc;

/// Service DID the chat-scoped client proxies through.
pub const CHAT_PROXY_TARGET: &str = "did:web:api.bsky.chat#bsky_chat";
pub const ROOM_CAPABILITIES_ID: &str = "fi.mau.bluesky.capabilities.2025_03_16";
pub const MAX_TEXT_LENGTH: usize = 10000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeName {
    pub display_name: &'static str,
    pub network_url: &'static str,
    pub network_id: &'static str,
    pub default_port: u16,
    pub default_command_prefix: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkGeneralCapabilities {
    pub disappearing_messages: bool,
    pub aggressive_update_info: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomFeatures {
    pub id: &'static str,
    pub max_text_length: usize,
}

pub struct LoginFlow {
    pub name: &'static str,
    pub description: &'static str,
    pub id: &'static str,
}

pub const PASSWORD_FLOW_ID: &str = "password";

static LOGIN_FLOWS: [LoginFlow; 1] = [LoginFlow {
    name: "Username & password",
    description: "Log in by entering your Bluesky username and password",
    id: PASSWORD_FLOW_ID,
}];

/// Process-wide entry point: builds sessions from stored logins and starts
/// new ones through [`PasswordLogin`].
pub struct BlueskyConnector {
    pub(crate) config: Arc<Config>,
    pub(crate) http: Arc<dyn HttpClient>,
    pub(crate) identity_resolver: Arc<dyn IdentityResolver>,
}

impl BlueskyConnector {
    pub fn new(config: Config, http: Arc<dyn HttpClient>) -> Result<Self, ConfigError> {
        config.post_process()?;
        Ok(Self {
            config: Arc::new(config),
            http,
            identity_resolver: Arc::new(DocumentResolver),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn name(&self) -> BridgeName {
        BridgeName {
            display_name: "Bluesky",
            network_url: "https://bsky.app",
            network_id: "bluesky",
            default_port: 29340,
            default_command_prefix: "!bsky",
        }
    }

    pub fn capabilities(&self) -> NetworkGeneralCapabilities {
        NetworkGeneralCapabilities {
            disappearing_messages: false,
            aggressive_update_info: false,
        }
    }

    pub fn bridge_info_version(&self) -> (u32, u32) {
        (1, 1)
    }

    pub fn login_flows(&self) -> &'static [LoginFlow] {
        &LOGIN_FLOWS
    }

    pub fn create_login(
        &self,
        store: Arc<dyn LoginStore>,
        events: Arc<dyn EventSink>,
        bridge_state: Arc<dyn BridgeStateSink>,
    ) -> PasswordLogin<'_> {
        PasswordLogin::new(self, store, events, bridge_state)
    }

    pub(crate) fn xrpc_client(&self, host: impl Into<String>) -> XrpcClient {
        XrpcClient::new(self.http.clone(), host, self.config.user_agent.clone())
    }

    /// Builds the client for a stored login. Nothing touches the network
    /// until [`BlueskyClient::connect`].
    pub fn load_user_login(
        &self,
        login: PersistedLogin,
        store: Arc<dyn LoginStore>,
        events: Arc<dyn EventSink>,
        bridge_state: Arc<dyn BridgeStateSink>,
    ) -> Arc<BlueskyClient> {
        let xrpc = self
            .xrpc_client(login.metadata.host.clone())
            .with_auth(login.metadata.auth.clone());
        let chat_rpc = xrpc.scoped(ATPROTO_PROXY_HEADER, CHAT_PROXY_TARGET);
        let user_login = Arc::new(UserLogin::new(login, store, events, bridge_state));
        Arc::new(BlueskyClient::new(
            user_login,
            self.config.clone(),
            xrpc,
            chat_rpc,
            self.identity_resolver.clone(),
        ))
    }
}

impl BlueskyClient {
    pub fn room_capabilities(&self) -> RoomFeatures {
        RoomFeatures {
            id: ROOM_CAPABILITIES_ID,
            max_text_length: MAX_TEXT_LENGTH,
        }
    }
}
