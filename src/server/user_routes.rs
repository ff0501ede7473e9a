//! User management endpoints: self-service profile and admin management.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::session::Session;
use super::state::{GuardedUserManager, ServerState};
use crate::user::{Permission, User, UserPatch, UserRole};

#[derive(Deserialize, Debug)]
struct SearchQuery {
    search: Option<String>,
}

#[derive(Serialize)]
struct UserPayload {
    username: String,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    bio: Option<String>,
    role: UserRole,
}

impl From<User> for UserPayload {
    fn from(user: User) -> Self {
        UserPayload {
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            bio: user.bio,
            role: user.role,
        }
    }
}

fn require_user_manager(session: &Session) -> Result<(), ApiError> {
    if session.has_permission(Permission::ManageUsers) {
        Ok(())
    } else {
        Err(ApiError::PermissionDenied)
    }
}

/// Rejects fields a non-admin must never change on their own record.
/// A submitted role is an explicit error, never a silent no-op, so a
/// self-promotion attempt cannot pass unnoticed.
fn reject_privileged_fields(session: &Session, patch: &UserPatch) -> Result<(), ApiError> {
    if session.has_permission(Permission::ManageUsers) {
        return Ok(());
    }
    if patch.role.is_some() {
        return Err(ApiError::validation(
            "role",
            "only administrators may change roles",
        ));
    }
    if patch.username.is_some() {
        return Err(ApiError::validation(
            "username",
            "only administrators may change usernames",
        ));
    }
    Ok(())
}

async fn list_users(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<UserPayload>>, ApiError> {
    require_user_manager(&session)?;
    let users = user_manager.list_users(query.search.as_deref())?;
    Ok(Json(users.into_iter().map(UserPayload::from).collect()))
}

async fn get_me(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
) -> Result<Json<UserPayload>, ApiError> {
    let user = user_manager
        .get_user(session.user_id)?
        .ok_or(ApiError::NotFound("user"))?;
    Ok(Json(user.into()))
}

async fn patch_me(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Json(patch): Json<UserPatch>,
) -> Result<Json<UserPayload>, ApiError> {
    reject_privileged_fields(&session, &patch)?;
    let user = user_manager.update_user(session.user_id, &patch)?;
    Ok(Json(user.into()))
}

async fn get_user(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Path(username): Path<String>,
) -> Result<Json<UserPayload>, ApiError> {
    require_user_manager(&session)?;
    let user = user_manager
        .get_user_by_username(&username)?
        .ok_or(ApiError::NotFound("user"))?;
    Ok(Json(user.into()))
}

async fn patch_user(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Path(username): Path<String>,
    Json(patch): Json<UserPatch>,
) -> Result<Json<UserPayload>, ApiError> {
    require_user_manager(&session)?;
    let user = user_manager
        .get_user_by_username(&username)?
        .ok_or(ApiError::NotFound("user"))?;
    let updated = user_manager.update_user(user.id, &patch)?;
    Ok(Json(updated.into()))
}

async fn delete_user(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Path(username): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_user_manager(&session)?;
    if user_manager.delete_user(&username)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("user"))
    }
}

pub fn make_user_routes(state: ServerState) -> Router {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/me", get(get_me).patch(patch_me))
        .route(
            "/users/{username}",
            get(get_user).patch(patch_user).delete(delete_user),
        )
        .with_state(state)
}
