//! Integration tests for the session event stream.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_event_stream_rejections() {
    let app = helpers::TestApp::new();
    let dm = app.user("dm");
    let session = app.create_session(&dm, json!({ "title": "Guarded" })).await;
    let id = session["id"].as_str().expect("id");

    assert_eq!(app.events(id, None).await.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        app.events(&uuid::Uuid::new_v4().to_string(), Some(&dm))
            .await
            .status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        app.events(id, Some(&app.user("stranger"))).await.status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(app.realtime.registry.session_count(), 0);
}

#[tokio::test]
async fn test_join_chat_and_disconnect_end_to_end() {
    let app = helpers::TestApp::new();
    let dm = app.user("dm");
    let alice = app.user("alice");

    let session = app.create_session(&dm, json!({ "title": "Live" })).await;
    let id = session["id"].as_str().expect("id").to_string();
    let key = session["sessionKey"].as_str().expect("key").to_string();
    assert_eq!(app.join(&alice, &key, Some("Elara")).await.status, StatusCode::OK);

    let mut alice_events = app.events(&id, Some(&alice)).await.expect_open();
    let connected = alice_events.next().await;
    assert_eq!(connected["type"], "connected");
    assert_eq!(connected["userId"], json!(alice.id.to_string()));
    let snapshot = alice_events.next().await;
    assert_eq!(snapshot["type"], "session_update");
    assert_eq!(snapshot["session"]["sessionKey"], json!(key));
    assert_eq!(snapshot["session"]["players"][0]["characterName"], "Elara");

    // The DM opens a stream; only alice hears about it.
    let mut dm_events = app.events(&id, Some(&dm)).await.expect_open();
    assert_eq!(dm_events.next().await["type"], "connected");
    assert_eq!(dm_events.next().await["type"], "session_update");
    let joined = alice_events.next().await;
    assert_eq!(joined["type"], "participant_joined");
    assert_eq!(joined["userId"], json!(dm.id.to_string()));

    let posted = app
        .request(
            "POST",
            &format!("/api/sessions/{id}/chat"),
            Some(json!({ "message": "hello" })),
            Some(&alice),
        )
        .await;
    assert_eq!(posted.status, StatusCode::OK);

    for events in [&mut alice_events, &mut dm_events] {
        let message = events.next_of("new_message").await;
        assert_eq!(message["message"]["message"], "hello");
        assert_eq!(message["message"]["roomId"], "general");
        assert_eq!(message["message"]["username"], "alice");
    }

    drop(dm_events);
    let left = alice_events.next_of("participant_left").await;
    assert_eq!(left["userId"], json!(dm.id.to_string()));
    alice_events.assert_quiet(100).await;

    assert_eq!(
        app.realtime
            .registry
            .connection_count(id.parse().expect("session id")),
        1
    );
}

#[tokio::test]
async fn test_status_and_private_room_events() {
    let app = helpers::TestApp::new();
    let dm = app.user("dm");
    let alice = app.user("alice");
    let session = app.create_session(&dm, json!({ "title": "Rooms" })).await;
    let id = session["id"].as_str().expect("id").to_string();
    let key = session["sessionKey"].as_str().expect("key").to_string();
    app.join(&alice, &key, None).await;

    let mut dm_events = app.events(&id, Some(&dm)).await.expect_open();
    dm_events.next_of("session_update").await;

    app.request(
        "POST",
        &format!("/api/sessions/{id}/status"),
        Some(json!({ "isOnline": false })),
        Some(&alice),
    )
    .await;
    let status = dm_events.next_of("participant_status_update").await;
    assert_eq!(status["isOnline"], false);
    assert_eq!(status["previousStatus"], true);

    // Same status again: nothing is broadcast.
    app.request(
        "POST",
        &format!("/api/sessions/{id}/status"),
        Some(json!({ "isOnline": false })),
        Some(&alice),
    )
    .await;
    dm_events.assert_quiet(100).await;

    let room = app
        .request(
            "POST",
            &format!("/api/sessions/{id}/chat-rooms"),
            Some(json!({ "name": "Secret", "isPrivate": true, "allowedUsers": [] })),
            Some(&dm),
        )
        .await;
    assert_eq!(room.status, StatusCode::OK);
    let room_id = room.body["data"]["id"].as_str().expect("room id").to_string();

    let rooms = dm_events.next_of("chat_rooms_update").await;
    assert!(
        rooms["chatRooms"]
            .as_array()
            .is_some_and(|r| r.iter().any(|room| room["id"] == json!(room_id)))
    );

    let blocked = app
        .request(
            "POST",
            &format!("/api/sessions/{id}/chat"),
            Some(json!({ "message": "psst", "roomId": room_id })),
            Some(&alice),
        )
        .await;
    assert_eq!(blocked.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_webrtc_signal_is_relayed() {
    let app = helpers::TestApp::new();
    let dm = app.user("dm");
    let alice = app.user("alice");
    let session = app.create_session(&dm, json!({ "title": "Voice" })).await;
    let id = session["id"].as_str().expect("id").to_string();
    let key = session["sessionKey"].as_str().expect("key").to_string();
    app.join(&alice, &key, None).await;

    let mut dm_events = app.events(&id, Some(&dm)).await.expect_open();
    dm_events.next_of("session_update").await;

    let sent = app
        .request(
            "POST",
            &format!("/api/sessions/{id}/webrtc"),
            Some(json!({
                "signalType": "offer",
                "data": { "sdp": "v=0" },
                "targetUserId": dm.id,
            })),
            Some(&alice),
        )
        .await;
    assert_eq!(sent.status, StatusCode::OK);

    let signal = dm_events.next_of("webrtc_signal").await;
    assert_eq!(signal["signalType"], "offer");
    assert_eq!(signal["data"]["sdp"], "v=0");
    assert_eq!(signal["fromUserId"], json!(alice.id.to_string()));
    assert_eq!(signal["targetUserId"], json!(dm.id.to_string()));
}
