//! Review and comment endpoints, nested under titles. Reads are public;
//! posting requires authentication; edits require authorship or the
//! moderation capability.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::error::ApiError;
use super::session::Session;
use super::state::{GuardedCatalogStore, ServerState};
use crate::catalog_store::validation::{validate_score, validate_text};
use crate::catalog_store::{CatalogStore, Comment, CreateReviewOutcome, Review, ReviewStore};
use crate::user::Permission;

#[derive(Deserialize, Debug)]
struct PageQuery {
    limit: Option<usize>,
    offset: Option<usize>,
}

#[derive(Deserialize, Debug)]
struct ReviewBody {
    text: String,
    score: i32,
}

#[derive(Deserialize, Debug)]
struct ReviewPatchBody {
    text: Option<String>,
    score: Option<i32>,
}

#[derive(Deserialize, Debug)]
struct CommentBody {
    text: String,
}

#[derive(Serialize)]
struct ReviewPayload {
    id: i64,
    text: String,
    /// Author username; null when the account has since been deleted.
    author: Option<String>,
    score: i32,
    pub_date: String,
}

#[derive(Serialize)]
struct CommentPayload {
    id: i64,
    text: String,
    author: Option<String>,
    pub_date: String,
}

fn format_pub_date(unix_secs: i64) -> String {
    chrono::DateTime::from_timestamp(unix_secs, 0)
        .unwrap_or_default()
        .to_rfc3339()
}

fn review_payload(review: Review, authors: &HashMap<i64, String>) -> ReviewPayload {
    ReviewPayload {
        id: review.id,
        text: review.text,
        author: authors.get(&review.author_id).cloned(),
        score: review.score,
        pub_date: format_pub_date(review.pub_date),
    }
}

fn comment_payload(comment: Comment, authors: &HashMap<i64, String>) -> CommentPayload {
    CommentPayload {
        id: comment.id,
        text: comment.text,
        author: authors.get(&comment.author_id).cloned(),
        pub_date: format_pub_date(comment.pub_date),
    }
}

/// Authors may edit their own posts; moderators and admins may edit any.
fn require_author_or_moderator(session: &Session, author_id: i64) -> Result<(), ApiError> {
    if session.is_author(author_id) || session.has_permission(Permission::ModerateContent) {
        Ok(())
    } else {
        Err(ApiError::PermissionDenied)
    }
}

fn require_poster(session: &Session) -> Result<(), ApiError> {
    if session.has_permission(Permission::PostContent) {
        Ok(())
    } else {
        Err(ApiError::PermissionDenied)
    }
}

fn ensure_title_exists(
    catalog_store: &GuardedCatalogStore,
    title_id: i64,
) -> Result<(), ApiError> {
    match catalog_store.get_title(title_id)? {
        Some(_) => Ok(()),
        None => Err(ApiError::NotFound("title")),
    }
}

fn lookup_review(
    catalog_store: &GuardedCatalogStore,
    title_id: i64,
    review_id: i64,
) -> Result<Review, ApiError> {
    ensure_title_exists(catalog_store, title_id)?;
    catalog_store
        .get_review(title_id, review_id)?
        .ok_or(ApiError::NotFound("review"))
}

// ============================================================================
// Reviews
// ============================================================================

async fn list_reviews(
    State(state): State<ServerState>,
    Path(title_id): Path<i64>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<ReviewPayload>>, ApiError> {
    ensure_title_exists(&state.catalog_store, title_id)?;
    let reviews = state
        .catalog_store
        .list_reviews(title_id, page.limit, page.offset)?;

    let author_ids: Vec<i64> = reviews.iter().map(|r| r.author_id).collect();
    let authors = state.user_manager.get_usernames_by_ids(&author_ids)?;

    Ok(Json(
        reviews
            .into_iter()
            .map(|review| review_payload(review, &authors))
            .collect(),
    ))
}

async fn create_review(
    session: Session,
    State(state): State<ServerState>,
    Path(title_id): Path<i64>,
    Json(body): Json<ReviewBody>,
) -> Result<Response, ApiError> {
    require_poster(&session)?;
    validate_text(&body.text).map_err(ApiError::from_issues)?;
    validate_score(body.score).map_err(ApiError::from_issues)?;
    ensure_title_exists(&state.catalog_store, title_id)?;

    match state
        .catalog_store
        .create_review(title_id, session.user_id, &body.text, body.score)?
    {
        CreateReviewOutcome::Created(review) => {
            let authors = state.user_manager.get_usernames_by_ids(&[review.author_id])?;
            Ok((StatusCode::CREATED, Json(review_payload(review, &authors))).into_response())
        }
        CreateReviewOutcome::AlreadyReviewed => Err(ApiError::Conflict(
            "you have already reviewed this title".to_string(),
        )),
    }
}

async fn get_review(
    State(state): State<ServerState>,
    Path((title_id, review_id)): Path<(i64, i64)>,
) -> Result<Json<ReviewPayload>, ApiError> {
    let review = lookup_review(&state.catalog_store, title_id, review_id)?;
    let authors = state.user_manager.get_usernames_by_ids(&[review.author_id])?;
    Ok(Json(review_payload(review, &authors)))
}

async fn patch_review(
    session: Session,
    State(state): State<ServerState>,
    Path((title_id, review_id)): Path<(i64, i64)>,
    Json(body): Json<ReviewPatchBody>,
) -> Result<Json<ReviewPayload>, ApiError> {
    let review = lookup_review(&state.catalog_store, title_id, review_id)?;
    require_author_or_moderator(&session, review.author_id)?;

    if let Some(text) = &body.text {
        validate_text(text).map_err(ApiError::from_issues)?;
    }
    if let Some(score) = body.score {
        validate_score(score).map_err(ApiError::from_issues)?;
    }

    let updated = state
        .catalog_store
        .update_review(title_id, review_id, body.text.as_deref(), body.score)?
        .ok_or(ApiError::NotFound("review"))?;

    let authors = state.user_manager.get_usernames_by_ids(&[updated.author_id])?;
    Ok(Json(review_payload(updated, &authors)))
}

async fn delete_review(
    session: Session,
    State(state): State<ServerState>,
    Path((title_id, review_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    let review = lookup_review(&state.catalog_store, title_id, review_id)?;
    require_author_or_moderator(&session, review.author_id)?;

    state.catalog_store.delete_review(title_id, review_id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Comments
// ============================================================================

async fn list_comments(
    State(state): State<ServerState>,
    Path((title_id, review_id)): Path<(i64, i64)>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<CommentPayload>>, ApiError> {
    lookup_review(&state.catalog_store, title_id, review_id)?;
    let comments = state
        .catalog_store
        .list_comments(review_id, page.limit, page.offset)?;

    let author_ids: Vec<i64> = comments.iter().map(|c| c.author_id).collect();
    let authors = state.user_manager.get_usernames_by_ids(&author_ids)?;

    Ok(Json(
        comments
            .into_iter()
            .map(|comment| comment_payload(comment, &authors))
            .collect(),
    ))
}

async fn create_comment(
    session: Session,
    State(state): State<ServerState>,
    Path((title_id, review_id)): Path<(i64, i64)>,
    Json(body): Json<CommentBody>,
) -> Result<Response, ApiError> {
    require_poster(&session)?;
    validate_text(&body.text).map_err(ApiError::from_issues)?;
    lookup_review(&state.catalog_store, title_id, review_id)?;

    let comment = state
        .catalog_store
        .create_comment(review_id, session.user_id, &body.text)?;
    let authors = state.user_manager.get_usernames_by_ids(&[comment.author_id])?;
    Ok((StatusCode::CREATED, Json(comment_payload(comment, &authors))).into_response())
}

async fn get_comment(
    State(state): State<ServerState>,
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
) -> Result<Json<CommentPayload>, ApiError> {
    lookup_review(&state.catalog_store, title_id, review_id)?;
    let comment = state
        .catalog_store
        .get_comment(review_id, comment_id)?
        .ok_or(ApiError::NotFound("comment"))?;
    let authors = state.user_manager.get_usernames_by_ids(&[comment.author_id])?;
    Ok(Json(comment_payload(comment, &authors)))
}

async fn patch_comment(
    session: Session,
    State(state): State<ServerState>,
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
    Json(body): Json<CommentBody>,
) -> Result<Json<CommentPayload>, ApiError> {
    lookup_review(&state.catalog_store, title_id, review_id)?;
    let comment = state
        .catalog_store
        .get_comment(review_id, comment_id)?
        .ok_or(ApiError::NotFound("comment"))?;
    require_author_or_moderator(&session, comment.author_id)?;
    validate_text(&body.text).map_err(ApiError::from_issues)?;

    let updated = state
        .catalog_store
        .update_comment(review_id, comment_id, &body.text)?
        .ok_or(ApiError::NotFound("comment"))?;
    let authors = state.user_manager.get_usernames_by_ids(&[updated.author_id])?;
    Ok(Json(comment_payload(updated, &authors)))
}

async fn delete_comment(
    session: Session,
    State(state): State<ServerState>,
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
) -> Result<StatusCode, ApiError> {
    lookup_review(&state.catalog_store, title_id, review_id)?;
    let comment = state
        .catalog_store
        .get_comment(review_id, comment_id)?
        .ok_or(ApiError::NotFound("comment"))?;
    require_author_or_moderator(&session, comment.author_id)?;

    state.catalog_store.delete_comment(review_id, comment_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn make_review_routes(state: ServerState) -> Router {
    Router::new()
        .route(
            "/titles/{title_id}/reviews",
            get(list_reviews).post(create_review),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}",
            get(get_review).patch(patch_review).delete(delete_review),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments",
            get(list_comments).post(create_comment),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
            get(get_comment).patch(patch_comment).delete(delete_comment),
        )
        .with_state(state)
}
