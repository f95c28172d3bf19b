use axum::extract::{ FromRequestParts, Query };
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde::Deserialize;

use crate::auth::Caller;
use crate::error::AppError;

use super::AppState;

#[derive(Deserialize)]
struct TokenParam {
    token: Option<String>,
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").or_else(|| value.strip_prefix("bearer "))?;
    Some(token.trim().to_string())
}

/// Browsers cannot set headers on a WebSocket handshake, so the stream
/// endpoint also accepts `?token=`.
fn query_token(parts: &Parts) -> Option<String> {
    Query::<TokenParam>::try_from_uri(&parts.uri).ok()?.0.token
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .or_else(|| query_token(parts))
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthorized)?;

        state.tokens.verify(&token)
    }
}
