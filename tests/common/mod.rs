#![allow(dead_code)]

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use bluesky_bridge::config::Config;
use bluesky_bridge::ids::UserLoginId;
use bluesky_bridge::net::{HttpClient, HttpRequest, HttpResponse};
use bluesky_bridge::store::error::Result as StoreResult;
use bluesky_bridge::store::{
    LoginStore, MemoryLoginStore, PersistedLogin, RemoteProfile, StoreError, UserLoginMetadata,
};
use bluesky_bridge::types::events::{ChannelEventSink, RemoteEvent};
use bluesky_bridge::types::state::{BridgeState, BridgeStateSink};
use bluesky_bridge::xrpc::AuthInfo;
use bluesky_bridge::{BlueskyClient, BlueskyConnector};
use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedReceiver;

pub const ME: &str = "did:plc:alice";
pub const BOB: &str = "did:plc:bob";
pub const PDS: &str = "https://pds.example";

#[derive(Default)]
struct Route {
    once: VecDeque<HttpResponse>,
    default: Option<HttpResponse>,
}

/// Answers XRPC calls by NSID and records every request.
#[derive(Default)]
pub struct MockHttpClient {
    routes: Mutex<HashMap<String, Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

fn json_response(status: u16, body: &Value) -> HttpResponse {
    HttpResponse {
        status_code: status,
        body: body.to_string().into_bytes(),
    }
}

pub fn nsid_of(url: &str) -> &str {
    let path = url.split('?').next().unwrap_or_default();
    path.rsplit("/xrpc/").next().unwrap_or(path)
}

impl MockHttpClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Sets the response returned whenever no one-shot response is queued.
    pub fn respond(&self, nsid: &str, status: u16, body: Value) {
        self.routes
            .lock()
            .unwrap()
            .entry(nsid.to_string())
            .or_default()
            .default = Some(json_response(status, &body));
    }

    /// Queues a response used once, ahead of the default.
    pub fn respond_once(&self, nsid: &str, status: u16, body: Value) {
        self.routes
            .lock()
            .unwrap()
            .entry(nsid.to_string())
            .or_default()
            .once
            .push_back(json_response(status, &body));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_for(&self, nsid: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|req| nsid_of(&req.url) == nsid)
            .collect()
    }

    pub fn count(&self, nsid: &str) -> usize {
        self.requests_for(nsid).len()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn execute(&self, request: HttpRequest) -> anyhow::Result<HttpResponse> {
        let nsid = nsid_of(&request.url).to_string();
        self.requests.lock().unwrap().push(request);
        let mut routes = self.routes.lock().unwrap();
        let response = routes.get_mut(&nsid).and_then(|route| {
            route
                .once
                .pop_front()
                .or_else(|| route.default.clone())
        });
        Ok(response.unwrap_or_else(|| {
            json_response(
                501,
                &json!({"error": "MethodNotImplemented", "message": nsid}),
            )
        }))
    }
}

/// Collects every reported bridge state.
#[derive(Default)]
pub struct RecordingStateSink {
    states: Mutex<Vec<BridgeState>>,
}

impl RecordingStateSink {
    pub fn states(&self) -> Vec<BridgeState> {
        self.states.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<BridgeState> {
        self.states.lock().unwrap().last().cloned()
    }
}

impl BridgeStateSink for RecordingStateSink {
    fn send_state(&self, state: BridgeState) {
        self.states.lock().unwrap().push(state);
    }
}

/// A memory store whose saves can be made to fail.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryLoginStore,
    pub fail_saves: AtomicBool,
}

impl FlakyStore {
    pub fn set_failing(&self, failing: bool) {
        self.fail_saves.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl LoginStore for FlakyStore {
    async fn save(&self, login: &PersistedLogin) -> StoreResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("disk full".into()));
        }
        self.inner.save(login).await
    }

    async fn load(&self, id: &UserLoginId) -> StoreResult<Option<PersistedLogin>> {
        self.inner.load(id).await
    }

    async fn delete(&self, id: &UserLoginId) -> StoreResult<()> {
        self.inner.delete(id).await
    }

    async fn list(&self) -> StoreResult<Vec<PersistedLogin>> {
        self.inner.list().await
    }
}

pub fn make_token(exp: DateTime<Utc>) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"ES256K","typ":"at+jwt"}"#);
    let payload = URL_SAFE_NO_PAD.encode(json!({"sub": ME, "exp": exp.timestamp()}).to_string());
    format!("{header}.{payload}.c2ln")
}

pub fn persisted_login(access_expiry: DateTime<Utc>) -> PersistedLogin {
    PersistedLogin {
        id: UserLoginId::new(ME),
        remote_name: "alice.test".into(),
        remote_profile: RemoteProfile {
            email: "alice@example.com".into(),
            username: "alice.test".into(),
        },
        metadata: UserLoginMetadata {
            host: PDS.into(),
            auth: AuthInfo {
                access_jwt: make_token(access_expiry),
                refresh_jwt: "refresh-1".into(),
                handle: "alice.test".into(),
                did: ME.into(),
            },
            cursor: "c0".into(),
        },
    }
}

pub fn session_response(did: &str, handle: &str, access_expiry: DateTime<Utc>) -> Value {
    json!({
        "accessJwt": make_token(access_expiry),
        "refreshJwt": "refresh-2",
        "handle": handle,
        "did": did,
    })
}

pub fn did_doc(did: &str, handle: &str, pds: &str) -> Value {
    json!({
        "id": did,
        "alsoKnownAs": [format!("at://{handle}")],
        "service": [{
            "id": "#atproto_pds",
            "type": "AtprotoPersonalDataServer",
            "serviceEndpoint": pds,
        }],
    })
}

pub fn message_view(id: &str, sender: &str, sent_at: &str, text: &str) -> Value {
    json!({
        "$type": "chat.bsky.convo.defs#messageView",
        "id": id,
        "rev": format!("rev-{id}"),
        "text": text,
        "sender": {"did": sender},
        "sentAt": sent_at,
    })
}

pub fn deleted_view(id: &str, sender: &str, sent_at: &str) -> Value {
    json!({
        "$type": "chat.bsky.convo.defs#deletedMessageView",
        "id": id,
        "rev": format!("rev-{id}"),
        "sender": {"did": sender},
        "sentAt": sent_at,
    })
}

pub fn create_message(convo: &str, message: Value) -> Value {
    json!({
        "$type": "chat.bsky.convo.defs#logCreateMessage",
        "rev": "r1",
        "convoId": convo,
        "message": message,
    })
}

pub fn convo_view(id: &str, unread: i64, last_message: Option<Value>) -> Value {
    let mut convo = json!({
        "id": id,
        "rev": "r1",
        "members": [
            {"did": ME, "handle": "alice.test", "displayName": "Alice"},
            {"did": BOB, "handle": "bob.test", "avatar": "https://cdn.example/bob.jpg"},
        ],
        "muted": false,
        "unreadCount": unread,
    });
    if let Some(last) = last_message {
        convo["lastMessage"] = last;
    }
    convo
}

pub struct Harness {
    pub http: Arc<MockHttpClient>,
    pub store: Arc<FlakyStore>,
    pub states: Arc<RecordingStateSink>,
    pub events: UnboundedReceiver<RemoteEvent>,
    pub connector: BlueskyConnector,
    pub client: Arc<BlueskyClient>,
}

impl Harness {
    pub async fn new(login: PersistedLogin) -> Self {
        let http = MockHttpClient::new();
        let store = Arc::new(FlakyStore::default());
        store.inner.save(&login).await.unwrap();
        let states = Arc::new(RecordingStateSink::default());
        let (sink, events) = ChannelEventSink::new();
        let connector = BlueskyConnector::new(Config::default(), http.clone()).unwrap();
        let client =
            connector.load_user_login(login, store.clone(), Arc::new(sink), states.clone());
        Self {
            http,
            store,
            states,
            events,
            connector,
            client,
        }
    }

    /// A harness whose access token expires in an hour.
    pub async fn fresh() -> Self {
        Self::new(persisted_login(Utc::now() + Duration::hours(1))).await
    }

    pub fn drain_events(&mut self) -> Vec<RemoteEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    pub async fn stored(&self) -> PersistedLogin {
        self.store
            .inner
            .load(&UserLoginId::new(ME))
            .await
            .unwrap()
            .unwrap()
    }
}
