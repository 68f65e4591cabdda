//! Presence report body: JSON, urlencoded form, or multipart.

use axum::extract::{Form, FromRequest, Json, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use serde::Deserialize;

use tavern_core::error::AppError;

/// `{ isOnline }` from any of the accepted encodings. Unload beacons
/// arrive as forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPayload {
    pub is_online: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonStatus {
    is_online: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FormStatus {
    is_online: String,
}

const FIELD: &str = "isOnline";

/// Parse a form flag.
pub fn parse_flag(raw: &str) -> Result<bool, AppError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" => Ok(true),
        "false" | "0" | "off" => Ok(false),
        other => Err(AppError::validation(format!(
            "isOnline must be true or false, got '{other}'"
        ))),
    }
}

impl<S: Send + Sync> FromRequest<S> for StatusPayload {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let is_online = if content_type.starts_with("multipart/form-data") {
            let mut multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::validation(e.body_text()))?;
            let mut found = None;
            while let Some(field) = multipart
                .next_field()
                .await
                .map_err(|e| AppError::validation(e.body_text()))?
            {
                if field.name() == Some(FIELD) {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| AppError::validation(e.body_text()))?;
                    found = Some(parse_flag(&text)?);
                    break;
                }
            }
            found.ok_or_else(|| AppError::validation("isOnline is required"))?
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(body) = Form::<FormStatus>::from_request(req, state)
                .await
                .map_err(|e| AppError::validation(e.body_text()))?;
            parse_flag(&body.is_online)?
        } else {
            let Json(body) = Json::<JsonStatus>::from_request(req, state)
                .await
                .map_err(|e| AppError::validation(e.body_text()))?;
            body.is_online
        };

        Ok(StatusPayload { is_online })
    }
}
