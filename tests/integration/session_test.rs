//! Integration tests for session lifecycle, chat, dice and presence.

mod helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::json;

#[tokio::test]
async fn test_health_check() {
    let app = helpers::TestApp::new();

    let response = app.request("GET", "/api/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "ok");
    assert_eq!(response.body["data"]["liveSessions"], 0);
}

#[tokio::test]
async fn test_requests_without_token_are_rejected() {
    let app = helpers::TestApp::new();

    let response = app
        .request("POST", "/api/sessions", Some(json!({ "title": "Nope" })), None)
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "AUTHENTICATION");
}

#[tokio::test]
async fn test_create_and_join_by_key() {
    let app = helpers::TestApp::new();
    let dm = app.user("dm");
    let alice = app.user("alice");

    let session = app
        .create_session(&dm, json!({ "title": "Lost Mine", "maxPlayers": 4 }))
        .await;
    let key = session["sessionKey"].as_str().expect("sessionKey").to_string();
    assert_eq!(key.len(), 6);
    assert!(key.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    assert_eq!(session["dmId"], json!(dm.id.to_string()));

    let joined = app.join(&alice, &key, Some("Thorin")).await;
    assert_eq!(joined.status, StatusCode::OK);
    assert_eq!(joined.body["data"]["role"], "player");
    assert_eq!(joined.body["data"]["newlyJoined"], true);
    assert_eq!(
        joined.body["data"]["session"]["players"][0]["characterName"],
        "Thorin"
    );

    let again = app.join(&alice, &key, None).await;
    assert_eq!(again.status, StatusCode::OK);
    assert_eq!(again.body["data"]["newlyJoined"], false);

    let as_dm = app.join(&dm, &key, None).await;
    assert_eq!(as_dm.body["data"]["role"], "dm");
    assert_eq!(
        as_dm.body["data"]["session"]["players"]
            .as_array()
            .map(Vec::len),
        Some(1)
    );
}

#[tokio::test]
async fn test_join_unknown_key_and_full_session() {
    let app = helpers::TestApp::new();
    let dm = app.user("dm");

    let missing = app.join(&app.user("x"), "ZZZZZZ", None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let session = app
        .create_session(&dm, json!({ "title": "Tiny", "maxPlayers": 1 }))
        .await;
    let key = session["sessionKey"].as_str().expect("sessionKey");

    assert_eq!(app.join(&app.user("a"), key, None).await.status, StatusCode::OK);
    let full = app.join(&app.user("b"), key, None).await;
    assert_eq!(full.status, StatusCode::BAD_REQUEST);
    assert_eq!(full.body["message"], "Session is full");
}

#[tokio::test]
async fn test_invalid_session_id_is_a_bad_request() {
    let app = helpers::TestApp::new();
    let user = app.user("u");

    let response = app
        .request("GET", "/api/sessions/not-a-uuid", None, Some(&user))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .request(
            "GET",
            &format!("/api/sessions/{}", uuid::Uuid::new_v4()),
            None,
            Some(&user),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_filters_public_sessions() {
    let app = helpers::TestApp::new();
    let dm = app.user("dm");

    app.create_session(&dm, json!({ "title": "Open Table" })).await;
    app.create_session(&dm, json!({ "title": "Friends Only", "isPublic": false }))
        .await;

    let all = app.request("GET", "/api/sessions", None, Some(&dm)).await;
    assert_eq!(all.body["data"].as_array().map(Vec::len), Some(2));

    let public = app
        .request("GET", "/api/sessions?public=true", None, Some(&dm))
        .await;
    let public = public.body["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(public.len(), 1);
    assert_eq!(public[0]["title"], "Open Table");
    assert_eq!(public[0]["playerCount"], 0);
}

#[tokio::test]
async fn test_chat_requires_participation() {
    let app = helpers::TestApp::new();
    let dm = app.user("dm");
    let session = app.create_session(&dm, json!({ "title": "Quiet" })).await;
    let id = session["id"].as_str().expect("id");

    let outsider = app
        .request(
            "POST",
            &format!("/api/sessions/{id}/chat"),
            Some(json!({ "message": "hi" })),
            Some(&app.user("lurker")),
        )
        .await;
    assert_eq!(outsider.status, StatusCode::FORBIDDEN);

    let empty = app
        .request(
            "POST",
            &format!("/api/sessions/{id}/chat"),
            Some(json!({ "message": "" })),
            Some(&dm),
        )
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);

    let posted = app
        .request(
            "POST",
            &format!("/api/sessions/{id}/chat"),
            Some(json!({ "message": "Welcome" })),
            Some(&dm),
        )
        .await;
    assert_eq!(posted.status, StatusCode::OK);
    assert_eq!(posted.body["data"]["roomId"], "general");
    assert_eq!(posted.body["data"]["type"], "chat");
}

#[tokio::test]
async fn test_roll_posts_result() {
    let app = helpers::TestApp::new();
    let dm = app.user("dm");
    let session = app.create_session(&dm, json!({ "title": "Dice" })).await;
    let id = session["id"].as_str().expect("id");

    let response = app
        .request(
            "POST",
            &format!("/api/sessions/{id}/roll"),
            Some(json!({ "expression": "2d6+3", "label": "Damage" })),
            Some(&dm),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let total = response.body["data"]["roll"]["total"].as_i64().expect("total");
    assert!((5..=15).contains(&total));
    assert_eq!(response.body["data"]["message"]["type"], "roll");
    assert!(
        response.body["data"]["message"]["message"]
            .as_str()
            .is_some_and(|m| m.contains("Damage"))
    );

    let bad = app
        .request(
            "POST",
            &format!("/api/sessions/{id}/roll"),
            Some(json!({ "expression": "1d1" })),
            Some(&dm),
        )
        .await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_status_accepts_form_beacon() {
    let app = helpers::TestApp::new();
    let dm = app.user("dm");
    let alice = app.user("alice");
    let session = app.create_session(&dm, json!({ "title": "Beacon" })).await;
    let id = session["id"].as_str().expect("id");
    let key = session["sessionKey"].as_str().expect("key");
    app.join(&alice, key, None).await;

    let req = Request::builder()
        .method("POST")
        .uri(format!("/api/sessions/{id}/status"))
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::AUTHORIZATION, format!("Bearer {}", alice.token))
        .body(Body::from("isOnline=false"))
        .expect("request");
    let response = app.send(req).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["changed"], true);
    assert_eq!(response.body["data"]["isOnline"], false);
    assert_eq!(response.body["data"]["previousStatus"], true);

    let repeat = app
        .request(
            "POST",
            &format!("/api/sessions/{id}/status"),
            Some(json!({ "isOnline": false })),
            Some(&alice),
        )
        .await;
    assert_eq!(repeat.body["data"]["changed"], false);
}

#[tokio::test]
async fn test_kick_is_creator_only() {
    let app = helpers::TestApp::new();
    let dm = app.user("dm");
    let alice = app.user("alice");
    let bob = app.user("bob");
    let session = app.create_session(&dm, json!({ "title": "Strict" })).await;
    let id = session["id"].as_str().expect("id");
    let key = session["sessionKey"].as_str().expect("key");
    app.join(&alice, key, None).await;
    app.join(&bob, key, None).await;

    let denied = app
        .request(
            "POST",
            &format!("/api/sessions/{id}/kick"),
            Some(json!({ "targetUserId": bob.id })),
            Some(&alice),
        )
        .await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let kicked = app
        .request(
            "POST",
            &format!("/api/sessions/{id}/kick"),
            Some(json!({ "targetUserId": bob.id, "reason": "AFK" })),
            Some(&dm),
        )
        .await;
    assert_eq!(kicked.status, StatusCode::OK);

    let session = app
        .request("GET", &format!("/api/sessions/{id}"), None, Some(&dm))
        .await;
    assert_eq!(session.body["data"]["players"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_creator_leaving_hands_over_or_ends() {
    let app = helpers::TestApp::new();
    let dm = app.user("dm");
    let alice = app.user("alice");
    let session = app.create_session(&dm, json!({ "title": "Handover" })).await;
    let id = session["id"].as_str().expect("id");
    let key = session["sessionKey"].as_str().expect("key");
    app.join(&alice, key, None).await;

    let left = app
        .request("POST", &format!("/api/sessions/{id}/leave"), None, Some(&dm))
        .await;
    assert_eq!(left.status, StatusCode::OK);
    assert_eq!(left.body["data"]["sessionEnded"], false);

    let session = app
        .request("GET", &format!("/api/sessions/{id}"), None, Some(&alice))
        .await;
    assert_eq!(session.body["data"]["creatorId"], json!(alice.id.to_string()));

    let left = app
        .request("POST", &format!("/api/sessions/{id}/leave"), None, Some(&alice))
        .await;
    assert_eq!(left.body["data"]["sessionEnded"], true);
}

#[tokio::test]
async fn test_delete_session() {
    let app = helpers::TestApp::new();
    let dm = app.user("dm");
    let session = app.create_session(&dm, json!({ "title": "Doomed" })).await;
    let id = session["id"].as_str().expect("id");

    let denied = app
        .request("DELETE", &format!("/api/sessions/{id}"), None, Some(&app.user("x")))
        .await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let deleted = app
        .request("DELETE", &format!("/api/sessions/{id}"), None, Some(&dm))
        .await;
    assert_eq!(deleted.status, StatusCode::OK);

    let gone = app
        .request("GET", &format!("/api/sessions/{id}"), None, Some(&dm))
        .await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}
