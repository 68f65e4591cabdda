//! REST client for the session API.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use tavern_core::types::SessionId;
use tavern_entity::{ChatMessage, InitiativeEntry, MessageType, Session, SessionSummary};

use crate::error::ClientError;
use crate::presence::StatusSink;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: String,
}

/// Server answer to a status report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub changed: bool,
    pub is_online: bool,
    #[serde(default)]
    pub previous_status: Option<bool>,
}

/// The parts of a dice roll a client usually shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollSummary {
    pub expression: String,
    pub total: i64,
    pub breakdown: String,
}

/// A roll and the chat message announcing it.
#[derive(Debug, Clone, Deserialize)]
pub struct RollReply {
    pub roll: RollSummary,
    pub message: ChatMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct InitiativeReply {
    entry: InitiativeEntry,
}

/// Authenticated HTTP client bound to one server.
#[derive(Debug, Clone)]
pub struct SessionClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl SessionClient {
    /// `base_url` is the server root, e.g. `http://localhost:8080`.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("tavern-client/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    /// `GET /sessions`, optionally restricted to public sessions.
    pub async fn list_sessions(&self, public_only: bool) -> Result<Vec<SessionSummary>, ClientError> {
        let path = if public_only {
            "/sessions?public=true"
        } else {
            "/sessions"
        };
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await?;
        decode(response).await
    }

    /// `GET /sessions/{id}`.
    pub async fn get_session(&self, session_id: SessionId) -> Result<Session, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("/sessions/{session_id}")))
            .bearer_auth(&self.token)
            .send()
            .await?;
        decode(response).await
    }

    /// Join by the six character key.
    pub async fn join(
        &self,
        session_key: &str,
        character_name: Option<&str>,
    ) -> Result<Session, ClientError> {
        #[derive(Deserialize)]
        struct Joined {
            session: Session,
        }

        let body = json!({ "sessionKey": session_key, "characterName": character_name });
        let response = self
            .http
            .post(self.url("/sessions/join"))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        let joined: Joined = decode(response).await?;
        Ok(joined.session)
    }

    /// Post a chat message.
    pub async fn send_message(
        &self,
        session_id: SessionId,
        message: &str,
        room_id: Option<&str>,
    ) -> Result<ChatMessage, ClientError> {
        let body = json!({ "message": message, "type": MessageType::Chat, "roomId": room_id });
        let response = self
            .http
            .post(self.url(&format!("/sessions/{session_id}/chat")))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        decode(response).await
    }

    /// Roll dice server-side and post the result.
    pub async fn roll(
        &self,
        session_id: SessionId,
        expression: &str,
        label: Option<&str>,
    ) -> Result<RollReply, ClientError> {
        let body = json!({ "expression": expression, "label": label });
        let response = self
            .http
            .post(self.url(&format!("/sessions/{session_id}/roll")))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        decode(response).await
    }

    /// Roll initiative for a character.
    pub async fn add_initiative(
        &self,
        session_id: SessionId,
        character_name: &str,
        expression: &str,
    ) -> Result<InitiativeEntry, ClientError> {
        let body = json!({ "characterName": character_name, "expression": expression });
        let response = self
            .http
            .post(self.url(&format!("/sessions/{session_id}/initiative")))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        let reply: InitiativeReply = decode(response).await?;
        Ok(reply.entry)
    }

    /// Report presence and wait for the answer.
    pub async fn update_status(
        &self,
        session_id: SessionId,
        is_online: bool,
    ) -> Result<StatusReport, ClientError> {
        let response = self
            .http
            .post(self.url(&format!("/sessions/{session_id}/status")))
            .bearer_auth(&self.token)
            .json(&json!({ "isOnline": is_online }))
            .send()
            .await?;
        decode(response).await
    }

    /// Best-effort status report for teardown paths.
    ///
    /// Sent as a urlencoded form, the shape a page-unload beacon uses.
    /// The request is spawned and its result discarded.
    pub fn notify_status(&self, session_id: SessionId, is_online: bool) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!(%session_id, "No runtime for status notification");
            return;
        };
        let request = self
            .http
            .post(self.url(&format!("/sessions/{session_id}/status")))
            .bearer_auth(&self.token)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(format!("isOnline={is_online}"));
        runtime.spawn(async move {
            if let Err(e) = request.send().await {
                tracing::debug!(error = %e, "Status notification failed");
            }
        });
    }

    /// Open the raw event stream response.
    pub(crate) async fn open_events(&self, session_id: SessionId) -> Result<Response, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("/sessions/{session_id}/events")))
            .bearer_auth(&self.token)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(api_error(response).await)
        }
    }

    /// A [`StatusSink`] reporting into one session.
    pub fn status_sink(&self, session_id: SessionId) -> SessionStatusSink {
        SessionStatusSink {
            client: self.clone(),
            session_id,
        }
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    if !response.status().is_success() {
        return Err(api_error(response).await);
    }
    let bytes = response.bytes().await?;
    let envelope: Envelope<T> = serde_json::from_slice(&bytes)?;
    Ok(envelope.data)
}

async fn api_error(response: Response) -> ClientError {
    let status = response.status();
    let body: ErrorBody = response.json().await.unwrap_or_default();
    ClientError::Api {
        status: status.as_u16(),
        code: if body.error.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("error")
                .to_string()
        } else {
            body.error
        },
        message: if body.message.is_empty() && status == StatusCode::UNAUTHORIZED {
            "Authentication required".to_string()
        } else {
            body.message
        },
    }
}

/// Status sink that reports through a [`SessionClient`].
#[derive(Debug, Clone)]
pub struct SessionStatusSink {
    client: SessionClient,
    session_id: SessionId,
}

#[async_trait]
impl StatusSink for SessionStatusSink {
    async fn push(&self, is_online: bool) -> Result<(), ClientError> {
        self.client
            .update_status(self.session_id, is_online)
            .await
            .map(|_| ())
    }

    fn notify(&self, is_online: bool) {
        self.client.notify_status(self.session_id, is_online);
    }
}
