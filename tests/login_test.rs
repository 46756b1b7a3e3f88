mod common;

use bluesky_bridge::LoginError;
use bluesky_bridge::api::convo::{GET_LOG, LIST_CONVOS};
use bluesky_bridge::api::server::CREATE_SESSION;
use bluesky_bridge::config::Config;
use bluesky_bridge::connector::BlueskyConnector;
use bluesky_bridge::ids::UserLoginId;
use bluesky_bridge::store::{FileStore, LoginStore, MemoryLoginStore};
use bluesky_bridge::types::events::ChannelEventSink;
use bluesky_bridge::types::state::BridgeStateEvent;
use chrono::{Duration as ChronoDuration, Utc};
use common::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test(start_paused = true)]
async fn test_password_login_persists_and_starts_sync() {
    let http = MockHttpClient::new();
    let mut resp = session_response(ME, "alice.test", Utc::now() + ChronoDuration::hours(2));
    resp["email"] = json!("alice@example.com");
    resp["didDoc"] = did_doc(ME, "alice.test", "https://morel.us-east.host.bsky.network");
    http.respond(CREATE_SESSION, 200, resp);
    http.respond(LIST_CONVOS, 200, json!({"convos": [convo_view("convoA", 0, None)]}));
    http.respond(GET_LOG, 200, json!({"cursor": "c1", "logs": []}));

    let connector = BlueskyConnector::new(Config::default(), http.clone()).unwrap();
    let store = Arc::new(MemoryLoginStore::new());
    let states = Arc::new(RecordingStateSink::default());
    let (sink, mut events) = ChannelEventSink::new();

    let complete = connector
        .create_login(store.clone(), Arc::new(sink), states.clone())
        .submit("bsky.social", "alice.test", "hunter2")
        .await
        .unwrap();
    assert_eq!(complete.instructions, "Successfully logged in as alice.test");

    let req = &http.requests_for(CREATE_SESSION)[0];
    assert!(req.url.starts_with("https://bsky.social/xrpc/"));
    let body: serde_json::Value = serde_json::from_slice(req.body.as_deref().unwrap()).unwrap();
    assert_eq!(body, json!({"identifier": "alice.test", "password": "hunter2"}));

    let stored = store.load(&UserLoginId::new(ME)).await.unwrap().unwrap();
    assert_eq!(stored.remote_name, "alice.test");
    assert_eq!(stored.remote_profile.email, "alice@example.com");
    assert_eq!(stored.metadata.host, "https://morel.us-east.host.bsky.network");
    assert_eq!(stored.metadata.auth.refresh_jwt, "refresh-2");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(events.try_recv().is_ok());
    assert!(complete.client.is_polling().await);
    assert!(
        http.requests_for(GET_LOG)[0]
            .url
            .starts_with("https://morel.us-east.host.bsky.network/xrpc/")
    );
    let states: Vec<_> = states.states().iter().map(|s| s.state_event).collect();
    assert_eq!(
        states,
        vec![BridgeStateEvent::Connecting, BridgeStateEvent::Connected]
    );

    complete.client.disconnect().await;
    assert_eq!(
        store
            .load(&UserLoginId::new(ME))
            .await
            .unwrap()
            .unwrap()
            .metadata
            .cursor,
        "c1"
    );
}

#[tokio::test]
async fn test_login_without_did_doc_uses_entryway() {
    let http = MockHttpClient::new();
    http.respond(
        CREATE_SESSION,
        200,
        session_response(ME, "alice.test", Utc::now() + ChronoDuration::hours(2)),
    );
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FileStore::new(dir.path()).await.unwrap());
    let connector = BlueskyConnector::new(Config::default(), http.clone()).unwrap();

    let complete = connector
        .create_login(
            store.clone(),
            Arc::new(ChannelEventSink::new().0),
            Arc::new(RecordingStateSink::default()),
        )
        .submit("example.social", "alice@example.com", "pw")
        .await
        .unwrap();
    complete.client.disconnect().await;

    let stored = store.load(&UserLoginId::new(ME)).await.unwrap().unwrap();
    assert_eq!(stored.metadata.host, "https://example.social");
    assert_eq!(stored.remote_profile.email, "");
}

#[tokio::test]
async fn test_login_failures() {
    let http = MockHttpClient::new();
    http.respond_once(
        CREATE_SESSION,
        401,
        json!({"error": "AuthenticationRequired", "message": "Invalid identifier or password"}),
    );
    let mut resp = session_response(ME, "alice.test", Utc::now());
    resp["didDoc"] = json!({"id": "bogus"});
    http.respond_once(CREATE_SESSION, 200, resp);

    let connector = BlueskyConnector::new(Config::default(), http.clone()).unwrap();
    let store = Arc::new(MemoryLoginStore::new());
    let login = || {
        connector.create_login(
            store.clone(),
            Arc::new(ChannelEventSink::new().0),
            Arc::new(RecordingStateSink::default()),
        )
    };

    let err = login()
        .submit("bsky.social", "alice.test", "wrong")
        .await
        .unwrap_err();
    assert!(matches!(err, LoginError::CreateSession(_)));
    assert!(err.to_string().contains("Invalid identifier or password"));

    let err = login()
        .submit("bsky.social", "alice.test", "right")
        .await
        .unwrap_err();
    assert!(matches!(err, LoginError::DidDoc(_)));
    assert_eq!(store.save_count(), 0);
}

#[test]
fn test_connector_metadata() {
    let connector =
        BlueskyConnector::new(Config::default(), MockHttpClient::new()).unwrap();
    let name = connector.name();
    assert_eq!(name.display_name, "Bluesky");
    assert_eq!(name.network_id, "bluesky");
    assert_eq!(name.default_port, 29340);
    assert_eq!(name.default_command_prefix, "!bsky");
    assert_eq!(connector.bridge_info_version(), (1, 1));
    assert!(!connector.capabilities().disappearing_messages);
    assert_eq!(connector.login_flows()[0].id, "password");

    let bad = Config {
        displayname_template: "{nickname}".into(),
        ..Default::default()
    };
    assert!(BlueskyConnector::new(bad, MockHttpClient::new()).is_err());
}
