use super::state::ServerState;
use crate::user::auth::AuthTokenValue;
use crate::user::Permission;

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{request::Parts, StatusCode},
    response::IntoResponse,
};
use std::convert::Infallible;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use tracing::debug;

/// The authenticated identity of a request, resolved from a bearer token.
/// Handlers receive it as an explicit extractor argument; there is no
/// ambient current-user state anywhere.
#[derive(Debug)]
pub struct Session {
    pub user_id: i64,
    pub username: String,
    pub token: String,
    pub permissions: &'static [Permission],
}

impl Session {
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    /// Authorship check against a stored author id.
    pub fn is_author(&self, author_id: i64) -> bool {
        self.user_id == author_id
    }
}

pub const COOKIE_SESSION_TOKEN_KEY: &str = "session_token";
pub const HEADER_SESSION_TOKEN_KEY: &str = "Authorization";

pub enum SessionExtractionError {
    Unauthenticated,
}

impl IntoResponse for SessionExtractionError {
    fn into_response(self) -> axum::response::Response {
        match self {
            SessionExtractionError::Unauthenticated => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

async fn extract_session_token_from_cookies(
    parts: &mut Parts,
    ctx: &ServerState,
) -> Option<String> {
    CookieJar::from_request_parts(parts, &ctx)
        .await
        .ok()?
        .get(COOKIE_SESSION_TOKEN_KEY)
        .map(Cookie::value)
        .map(|s| s.to_string())
}

fn extract_session_token_from_headers(parts: &mut Parts) -> Option<String> {
    let raw = parts
        .headers
        .get(HEADER_SESSION_TOKEN_KEY)?
        .to_str()
        .ok()?;
    // both raw tokens and the conventional Bearer prefix are accepted
    let token = raw.strip_prefix("Bearer ").unwrap_or(raw);
    Some(token.to_string())
}

async fn extract_session_from_request_parts(
    parts: &mut Parts,
    ctx: &ServerState,
) -> Option<Session> {
    let token = match extract_session_token_from_cookies(parts, ctx)
        .await
        .or_else(|| extract_session_token_from_headers(parts))
    {
        None => {
            debug!("No token in cookies nor headers.");
            return None;
        }
        Some(x) => x,
    };

    let auth_token_value = AuthTokenValue(token);
    let auth_token = match ctx.user_manager.get_auth_token(&auth_token_value) {
        Ok(Some(auth_token)) => {
            if let Err(e) = ctx.user_manager.touch_auth_token(&auth_token_value) {
                debug!("Failed to update auth token last_used timestamp: {}", e);
                // not critical for authentication, carry on
            }
            auth_token
        }
        Ok(None) => {
            debug!("Auth token not found");
            return None;
        }
        Err(e) => {
            debug!("Failed to look up auth token: {}", e);
            return None;
        }
    };

    let user = match ctx.user_manager.get_user(auth_token.user_id) {
        Ok(Some(user)) => user,
        Ok(None) => {
            debug!("Token owner {} no longer exists", auth_token.user_id);
            return None;
        }
        Err(e) => {
            debug!("Failed to load user {}: {}", auth_token.user_id, e);
            return None;
        }
    };

    if !user.is_active {
        debug!("User {} is not active", user.username);
        return None;
    }

    Some(Session {
        user_id: user.id,
        username: user.username.clone(),
        token: auth_token.value.0,
        permissions: user.permissions(),
    })
}

impl FromRequestParts<ServerState> for Session {
    type Rejection = SessionExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        extract_session_from_request_parts(parts, ctx)
            .await
            .ok_or(SessionExtractionError::Unauthenticated)
    }
}

impl OptionalFromRequestParts<ServerState> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(extract_session_from_request_parts(parts, ctx).await)
    }
}
