mod common;

use bluesky_bridge::api::actor::GET_PROFILE;
use bluesky_bridge::api::convo::{GET_CONVO, SEND_MESSAGE, UPDATE_READ};
use bluesky_bridge::chatinfo::{ChatInfoError, wrap_avatar};
use bluesky_bridge::ids::{MessageId, PortalId, UserId};
use bluesky_bridge::outbound::OutboundError;
use bluesky_bridge::proto::ConvoView;
use bluesky_bridge::types::chat::{MutedUntil, RoomType};
use bluesky_bridge::types::message::{MessageContent, MessageType};
use common::*;
use serde_json::{Value, json};

fn body_json(req: &bluesky_bridge::net::HttpRequest) -> Value {
    serde_json::from_slice(req.body.as_deref().unwrap()).unwrap()
}

#[tokio::test]
async fn test_send_text_message() {
    let h = Harness::fresh().await;
    h.http.respond(
        SEND_MESSAGE,
        200,
        message_view("sent1", ME, "2024-05-01T12:00:00.500Z", "hello"),
    );

    let resp = h
        .client
        .handle_outbound_message(
            &PortalId::new("convoA"),
            &MessageContent {
                msg_type: MessageType::Text,
                body: "hello".into(),
            },
        )
        .await
        .unwrap();

    assert_eq!(resp.id, MessageId::new("convoA:sent1"));
    assert_eq!(resp.sender_id, UserId::new("plc-alice"));
    assert_eq!(resp.stream_order, 1_714_564_800_500);

    let req = &h.http.requests_for(SEND_MESSAGE)[0];
    assert_eq!(
        body_json(req),
        json!({"convoId": "convoA", "message": {"text": "hello"}})
    );
    assert_eq!(
        req.headers.get("Content-Type").map(String::as_str),
        Some("application/json")
    );
}

#[tokio::test]
async fn test_non_text_messages_are_rejected() {
    let h = Harness::fresh().await;

    let err = h
        .client
        .handle_outbound_message(
            &PortalId::new("convoA"),
            &MessageContent {
                msg_type: MessageType::Image,
                body: "cat.jpg".into(),
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        OutboundError::UnsupportedMessageType(MessageType::Image)
    ));
    assert!(h.http.requests().is_empty());
}

#[tokio::test]
async fn test_read_receipt_with_exact_message() {
    let h = Harness::fresh().await;
    h.http.respond(UPDATE_READ, 200, json!({"convo": convo_view("convoA", 0, None)}));

    h.client
        .handle_read_receipt(&PortalId::new("convoA"), Some(&MessageId::new("convoA:m1")))
        .await
        .unwrap();
    h.client
        .handle_read_receipt(&PortalId::new("convoA"), Some(&MessageId::new("nocolon")))
        .await
        .unwrap();
    h.client
        .handle_read_receipt(&PortalId::new("convoA"), None)
        .await
        .unwrap();

    let bodies: Vec<_> = h
        .http
        .requests_for(UPDATE_READ)
        .iter()
        .map(body_json)
        .collect();
    assert_eq!(bodies[0], json!({"convoId": "convoA", "messageId": "m1"}));
    assert_eq!(bodies[1], json!({"convoId": "convoA"}));
    assert_eq!(bodies[2], json!({"convoId": "convoA"}));
}

#[tokio::test]
async fn test_chat_info_for_dm() {
    let h = Harness::fresh().await;
    let mut convo = convo_view("convoA", 1, None);
    convo["muted"] = json!(true);
    h.http.respond(GET_CONVO, 200, json!({"convo": convo}));

    let info = h.client.get_chat_info(&PortalId::new("convoA")).await.unwrap();

    assert!(h.http.requests_for(GET_CONVO)[0].url.ends_with("?convoId=convoA"));
    assert_eq!(info.room_type, Some(RoomType::Dm));
    assert_eq!(info.user_local.muted_until, Some(MutedUntil::Forever));
    assert!(info.can_backfill);
    assert!(info.members.is_full);
    assert_eq!(info.members.total_member_count, 2);

    let alice = &info.members.members[&UserId::new("plc-alice")];
    assert!(alice.sender.is_from_me);
    assert_eq!(alice.user_info.name.as_deref(), Some("Alice"));
    assert_eq!(
        alice.user_info.identifiers,
        vec!["did:plc:alice".to_string(), "bluesky:alice.test".to_string()]
    );
    assert!(alice.user_info.avatar.as_ref().unwrap().remove);

    let bob = &info.members.members[&UserId::new("plc-bob")];
    // No display name: falls back to the handle.
    assert_eq!(bob.user_info.name.as_deref(), Some("bob.test"));
    assert_eq!(
        bob.user_info.avatar,
        Some(wrap_avatar("https://cdn.example/bob.jpg"))
    );
}

#[tokio::test]
async fn test_chat_info_skips_bad_members() {
    let h = Harness::fresh().await;
    let mut convo = convo_view("convoG", 0, None);
    convo["members"]
        .as_array_mut()
        .unwrap()
        .push(json!({"did": "not-a-did", "handle": "weird.test"}));
    let convo: ConvoView = serde_json::from_value(convo).unwrap();

    let info = h.client.wrap_chat_info(&convo);

    assert!(!info.members.is_full);
    assert_eq!(info.members.total_member_count, 3);
    assert_eq!(info.members.members.len(), 2);
    assert_eq!(info.room_type, None);
    assert_eq!(info.user_local.muted_until, None);
}

#[tokio::test]
async fn test_user_info() {
    let h = Harness::fresh().await;
    h.http.respond(
        GET_PROFILE,
        200,
        json!({"did": BOB, "handle": "bob.test", "displayName": "Bob"}),
    );

    let info = h.client.get_user_info(&UserId::new("plc-bob")).await.unwrap();
    assert_eq!(info.name.as_deref(), Some("Bob"));
    assert_eq!(info.identifiers[1], "bluesky:bob.test");
    assert!(
        h.http.requests_for(GET_PROFILE)[0]
            .url
            .ends_with("?actor=did%3Aplc%3Abob")
    );

    let err = h
        .client
        .get_user_info(&UserId::new("nodash"))
        .await
        .unwrap_err();
    assert!(matches!(err, ChatInfoError::InvalidUserId(_)));
    assert_eq!(h.http.count(GET_PROFILE), 1);
}

#[tokio::test]
async fn test_room_capabilities() {
    let h = Harness::fresh().await;
    let caps = h.client.room_capabilities();
    assert_eq!(caps.id, "fi.mau.bluesky.capabilities.2025_03_16");
    assert_eq!(caps.max_text_length, 10000);
}
