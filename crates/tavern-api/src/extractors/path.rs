//! Typed path parameters.

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;

use tavern_core::error::AppError;
use tavern_core::types::SessionId;

/// `{id}` segment parsed as a [`SessionId`], rejected with the JSON error
/// body instead of Axum's plain-text one.
#[derive(Debug, Clone, Copy)]
pub struct SessionPath(pub SessionId);

impl<S: Send + Sync> FromRequestParts<S> for SessionPath {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::validation(e.body_text()))?;

        raw.parse::<SessionId>()
            .map(SessionPath)
            .map_err(|_| AppError::validation(format!("Invalid session id: {raw}")))
    }
}
