//! Integration tests for the initiative tracker.

mod helpers;

use axum::http::StatusCode;
use serde_json::{Value, json};

async fn add(app: &helpers::TestApp, id: &str, user: &helpers::TestUser, name: &str, expr: &str) -> Value {
    let response = app
        .request(
            "POST",
            &format!("/api/sessions/{id}/initiative"),
            Some(json!({ "characterName": name, "expression": expr })),
            Some(user),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    response.body["data"]["entry"].clone()
}

async fn next_turn(app: &helpers::TestApp, id: &str, user: &helpers::TestUser) -> helpers::TestResponse {
    app.request(
        "POST",
        &format!("/api/sessions/{id}/initiative/next-turn"),
        None,
        Some(user),
    )
    .await
}

#[tokio::test]
async fn test_turn_order_skips_the_dead() {
    let app = helpers::TestApp::new();
    let dm = app.user("dm");
    let alice = app.user("alice");
    let session = app.create_session(&dm, json!({ "title": "Ambush" })).await;
    let id = session["id"].as_str().expect("id").to_string();
    let key = session["sessionKey"].as_str().expect("key").to_string();
    app.join(&alice, &key, None).await;

    let goblin = add(&app, &id, &dm, "Goblin", "1d2+50").await;
    add(&app, &id, &alice, "Elara", "1d2+100").await;
    add(&app, &id, &dm, "Wolf", "1d2+10").await;

    let mut events = app.events(&id, Some(&dm)).await.expect_open();
    let snapshot = events.next_of("session_update").await;
    let order: Vec<&str> = snapshot["session"]["initiativeOrder"]
        .as_array()
        .expect("order")
        .iter()
        .filter_map(|e| e["characterName"].as_str())
        .collect();
    assert_eq!(order, ["Elara", "Goblin", "Wolf"]);

    assert_eq!(next_turn(&app, &id, &alice).await.status, StatusCode::FORBIDDEN);

    let first = next_turn(&app, &id, &dm).await;
    assert_eq!(first.body["data"]["currentTurn"], 0);
    let update = events.next_of("initiative_update").await;
    assert_eq!(update["currentTurn"], 0);

    let toggled = app
        .request(
            "POST",
            &format!("/api/sessions/{id}/initiative/toggle-dead"),
            Some(json!({ "entryId": goblin["id"] })),
            Some(&dm),
        )
        .await;
    assert_eq!(toggled.status, StatusCode::OK);
    assert_eq!(toggled.body["data"]["isDead"], true);
    let notice = events.next_of("new_message").await;
    assert!(
        notice["message"]["message"]
            .as_str()
            .is_some_and(|m| m.contains("Goblin"))
    );

    let second = next_turn(&app, &id, &dm).await;
    assert_eq!(second.body["data"]["currentTurn"], 2);
    let wrapped = next_turn(&app, &id, &dm).await;
    assert_eq!(wrapped.body["data"]["currentTurn"], 0);
}

#[tokio::test]
async fn test_reroll_replaces_entry_and_removal_rules() {
    let app = helpers::TestApp::new();
    let dm = app.user("dm");
    let alice = app.user("alice");
    let bob = app.user("bob");
    let session = app.create_session(&dm, json!({ "title": "Skirmish" })).await;
    let id = session["id"].as_str().expect("id").to_string();
    let key = session["sessionKey"].as_str().expect("key").to_string();
    app.join(&alice, &key, None).await;
    app.join(&bob, &key, None).await;

    add(&app, &id, &alice, "Elara", "1d20").await;
    let elara = add(&app, &id, &alice, "Elara", "1d2+30").await;
    let detail = elara["rollDetails"].as_str().expect("rollDetails");
    assert!(detail.contains("= 3"), "unexpected breakdown {detail}");

    let session = app
        .request("GET", &format!("/api/sessions/{id}"), None, Some(&alice))
        .await;
    assert_eq!(
        session.body["data"]["initiativeOrder"].as_array().map(Vec::len),
        Some(1)
    );

    let entry_id = elara["id"].as_str().expect("entry id");
    let path = format!("/api/sessions/{id}/initiative?entryId={entry_id}");

    let denied = app.request("DELETE", &path, None, Some(&bob)).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let removed = app.request("DELETE", &path, None, Some(&alice)).await;
    assert_eq!(removed.status, StatusCode::OK);
    assert_eq!(removed.body["data"]["characterName"], "Elara");

    let missing = app.request("DELETE", &path, None, Some(&dm)).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bad_initiative_expression() {
    let app = helpers::TestApp::new();
    let dm = app.user("dm");
    let session = app.create_session(&dm, json!({ "title": "Oops" })).await;
    let id = session["id"].as_str().expect("id");

    let response = app
        .request(
            "POST",
            &format!("/api/sessions/{id}/initiative"),
            Some(json!({ "characterName": "Orc", "expression": "d20" })),
            Some(&dm),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}
