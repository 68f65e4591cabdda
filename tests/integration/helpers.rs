//! Shared test helpers for integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, BodyDataStream};
use axum::http::{Request, StatusCode, header};
use futures::StreamExt;
use serde_json::Value;
use tower::ServiceExt;

use tavern_auth::{JwtDecoder, JwtEncoder};
use tavern_client::sse::SseDecoder;
use tavern_core::config::AppConfig;
use tavern_core::types::UserId;
use tavern_database::MemorySessionRepository;
use tavern_realtime::RealtimeEngine;
use tavern_service::SessionService;

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Engine behind the event streams
    pub realtime: Arc<RealtimeEngine>,
    /// Application config
    pub config: AppConfig,
    encoder: JwtEncoder,
}

/// An authenticated caller
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: UserId,
    pub name: String,
    pub token: String,
}

impl TestApp {
    /// Create a new test application backed by the in-memory store
    pub fn new() -> Self {
        let config = AppConfig::default();

        let repo = Arc::new(MemorySessionRepository::new());
        let realtime = Arc::new(RealtimeEngine::new(config.realtime.clone()));
        let session_service = Arc::new(SessionService::new(
            repo,
            realtime.broadcaster.clone(),
            config.session.clone(),
            config.realtime.snapshot_message_limit,
        ));

        let state = tavern_api::AppState::new(
            Arc::new(config.clone()),
            Arc::new(JwtDecoder::new(&config.auth)),
            Arc::clone(&realtime),
            session_service,
        );

        Self {
            router: tavern_api::build_app(state),
            realtime,
            encoder: JwtEncoder::new(&config.auth),
            config,
        }
    }

    /// Mint a token for a fresh user
    pub fn user(&self, name: &str) -> TestUser {
        let id = UserId::new();
        let token = self
            .encoder
            .issue(id, name)
            .expect("Failed to issue token");
        TestUser {
            id,
            name: name.to_string(),
            token,
        }
    }

    /// Make a JSON request to the test app
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        user: Option<&TestUser>,
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");

        if let Some(user) = user {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", user.token));
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        self.send(req).await
    }

    /// Send a prepared request and parse the JSON body
    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }

    /// Open a session's event stream
    pub async fn events(&self, session_id: &str, user: Option<&TestUser>) -> EventsResponse {
        let mut req = Request::builder()
            .method("GET")
            .uri(format!("/api/sessions/{session_id}/events"))
            .header(header::ACCEPT, "text/event-stream");
        if let Some(user) = user {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", user.token));
        }
        let req = req.body(Body::empty()).expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        if status.is_success() {
            EventsResponse::Open(EventReader {
                body: response.into_body().into_data_stream(),
                decoder: SseDecoder::new(),
                pending: VecDeque::new(),
            })
        } else {
            EventsResponse::Rejected(status)
        }
    }

    /// Create a session and return its `data` object
    pub async fn create_session(&self, owner: &TestUser, body: Value) -> Value {
        let response = self
            .request("POST", "/api/sessions", Some(body), Some(owner))
            .await;
        assert_eq!(
            response.status,
            StatusCode::OK,
            "Create failed: {:?}",
            response.body
        );
        response.body["data"].clone()
    }

    /// Join by key and return the `data` object
    pub async fn join(&self, user: &TestUser, key: &str, character: Option<&str>) -> TestResponse {
        self.request(
            "POST",
            "/api/sessions/join",
            Some(serde_json::json!({ "sessionKey": key, "characterName": character })),
            Some(user),
        )
        .await
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}

/// Result of opening an event stream
pub enum EventsResponse {
    Open(EventReader),
    Rejected(StatusCode),
}

impl EventsResponse {
    pub fn expect_open(self) -> EventReader {
        match self {
            Self::Open(reader) => reader,
            Self::Rejected(status) => panic!("Event stream rejected with {status}"),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Open(_) => StatusCode::OK,
            Self::Rejected(status) => *status,
        }
    }
}

/// Reads decoded events off an open SSE body
pub struct EventReader {
    body: BodyDataStream,
    decoder: SseDecoder,
    pending: VecDeque<Value>,
}

impl EventReader {
    /// Next event, failing the test after two seconds
    pub async fn next(&mut self) -> Value {
        tokio::time::timeout(Duration::from_secs(2), self.next_inner())
            .await
            .expect("Timed out waiting for an event")
            .expect("Event stream ended")
    }

    /// Skip events until one of type `kind` arrives
    pub async fn next_of(&mut self, kind: &str) -> Value {
        loop {
            let event = self.next().await;
            if event["type"] == kind {
                return event;
            }
        }
    }

    /// Assert nothing arrives for `millis`
    pub async fn assert_quiet(&mut self, millis: u64) {
        let next = tokio::time::timeout(Duration::from_millis(millis), self.next_inner()).await;
        if let Ok(Some(event)) = next {
            panic!("Unexpected event {event}");
        }
    }

    async fn next_inner(&mut self) -> Option<Value> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            let chunk = self.body.next().await?.ok()?;
            for frame in self.decoder.push(&chunk) {
                let event = serde_json::from_str(&frame).expect("Event frame is not JSON");
                self.pending.push_back(event);
            }
        }
    }
}
