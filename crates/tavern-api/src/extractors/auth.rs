//! `AuthUser` extractor: finds the token, validates it, and injects context.

use axum::extract::{FromRequestParts, Query};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use tavern_core::error::AppError;
use tavern_service::RequestContext;

use crate::state::AppState;

/// Extracted authenticated user context available in handlers.
#[derive(Debug, Clone)]
pub struct AuthUser(pub RequestContext);

impl AuthUser {
    /// Returns the inner `RequestContext`.
    pub fn context(&self) -> &RequestContext {
        &self.0
    }
}

impl std::ops::Deref for AuthUser {
    type Target = RequestContext;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Token from, in order: `Authorization: Bearer`, the auth cookie, or
/// the `token` query parameter. EventSource cannot set headers, hence
/// the last two.
pub fn find_token(parts: &Parts, cookie_name: &str) -> Option<String> {
    let bearer = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    let jar = CookieJar::from_headers(&parts.headers);
    if let Some(cookie) = jar.get(cookie_name).filter(|c| !c.value().is_empty()) {
        return Some(cookie.value().to_string());
    }

    Query::<TokenQuery>::try_from_uri(&parts.uri)
        .ok()
        .and_then(|Query(q)| q.token)
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = find_token(parts, &state.config.auth.cookie_name)
            .ok_or_else(|| AppError::authentication("Missing authentication token"))?;

        let claims = state.jwt_decoder.decode(&token)?;

        Ok(AuthUser(RequestContext::new(
            claims.user_id(),
            claims.username,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).expect("request").into_parts().0
    }

    #[test]
    fn test_bearer_header_wins() {
        let p = parts(
            Request::get("/api/sessions?token=query")
                .header("authorization", "Bearer header")
                .header("cookie", "auth-token=cookie"),
        );
        assert_eq!(find_token(&p, "auth-token").as_deref(), Some("header"));
    }

    #[test]
    fn test_cookie_then_query() {
        let p = parts(Request::get("/api/sessions?token=query").header("cookie", "auth-token=cookie"));
        assert_eq!(find_token(&p, "auth-token").as_deref(), Some("cookie"));

        let p = parts(Request::get("/api/sessions/x/events?token=query"));
        assert_eq!(find_token(&p, "auth-token").as_deref(), Some("query"));
    }

    #[test]
    fn test_missing_token() {
        let p = parts(Request::get("/api/sessions").header("authorization", "Basic abc"));
        assert_eq!(find_token(&p, "auth-token"), None);
    }
}
