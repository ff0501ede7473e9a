//! Registration and token endpoints.

use axum::{
    body::Body,
    extract::State,
    http::{header, response, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::ApiError;
use super::metrics::{record_signup, record_token_issued};
use super::session::{Session, COOKIE_SESSION_TOKEN_KEY};
use super::state::{GuardedUserManager, ServerState};
use crate::user::auth::AuthTokenValue;

#[derive(Deserialize, Debug)]
struct SignupBody {
    pub email: String,
    pub username: String,
}

#[derive(Serialize)]
struct SignupResponse {
    username: String,
    email: String,
}

#[derive(Deserialize, Debug)]
struct TokenBody {
    pub username: String,
    pub confirmation_code: String,
}

#[derive(Serialize)]
struct TokenResponse {
    token: String,
}

async fn signup(
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<SignupBody>,
) -> Result<Json<SignupResponse>, ApiError> {
    debug!("signup() called for username {}", body.username);
    match user_manager.signup(&body.username, &body.email) {
        Ok(receipt) => {
            record_signup("accepted");
            Ok(Json(SignupResponse {
                username: receipt.username,
                email: receipt.email,
            }))
        }
        Err(err) => {
            record_signup("rejected");
            Err(err.into())
        }
    }
}

async fn token(
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<TokenBody>,
) -> Result<Response, ApiError> {
    let auth_token = user_manager.verify(&body.username, &body.confirmation_code)?;
    record_token_issued();

    let response_body = serde_json::to_string(&TokenResponse {
        token: auth_token.value.0.clone(),
    })
    .map_err(anyhow::Error::from)?;

    let cookie_value = HeaderValue::from_str(&format!(
        "{}={}; Path=/; HttpOnly",
        COOKIE_SESSION_TOKEN_KEY, auth_token.value.0
    ))
    .map_err(anyhow::Error::from)?;

    Ok(response::Builder::new()
        .status(StatusCode::CREATED)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::SET_COOKIE, cookie_value)
        .body(Body::from(response_body))
        .map_err(anyhow::Error::from)?)
}

async fn logout(
    State(user_manager): State<GuardedUserManager>,
    session: Session,
) -> Result<Response, ApiError> {
    user_manager
        .delete_auth_token(session.user_id, &AuthTokenValue(session.token))
        .map_err(ApiError::Internal)?;

    let cookie = Cookie::build(Cookie::new(COOKIE_SESSION_TOKEN_KEY, ""))
        .path("/")
        .expires(time::OffsetDateTime::now_utc() - time::Duration::days(1)) // Expire it in the past
        .same_site(SameSite::Lax)
        .build();

    Ok(response::Builder::new()
        .status(StatusCode::OK)
        .header(header::SET_COOKIE, cookie.to_string())
        .body(Body::empty())
        .map_err(anyhow::Error::from)?
        .into_response())
}

pub fn make_auth_routes(state: ServerState) -> Router {
    Router::new()
        .route("/signup", post(signup))
        .route("/token", post(token))
        .route("/logout", get(logout))
        .with_state(state)
}
