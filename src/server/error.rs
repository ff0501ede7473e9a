//! The API error taxonomy and its HTTP mapping.
//!
//! Every handler returns `Result<_, ApiError>`. Validation failures carry
//! field-level detail; store failures become opaque 500s and are logged.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::catalog_store::validation::FieldIssues;
use crate::user::{SignupError, UserUpdateError, VerifyError};

#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    Conflict(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("permission denied")]
    PermissionDenied,
    #[error("{0}")]
    Authentication(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        ApiError::Validation(vec![FieldError {
            field: field.to_string(),
            message: message.into(),
        }])
    }

    pub fn from_issues(issues: FieldIssues) -> Self {
        ApiError::Validation(
            issues
                .into_iter()
                .map(|(field, message)| FieldError {
                    field: field.to_string(),
                    message,
                })
                .collect(),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "validation", "fields": fields })),
            )
                .into_response(),
            ApiError::Conflict(message) => (
                StatusCode::CONFLICT,
                Json(json!({ "error": "conflict", "message": message })),
            )
                .into_response(),
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "not_found", "message": format!("{} not found", what) })),
            )
                .into_response(),
            ApiError::PermissionDenied => (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "permission_denied" })),
            )
                .into_response(),
            ApiError::Authentication(message) => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "authentication", "message": message })),
            )
                .into_response(),
            ApiError::Internal(err) => {
                error!("Internal error: {:#}", err);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

impl From<SignupError> for ApiError {
    fn from(err: SignupError) -> Self {
        match err {
            SignupError::InvalidUsername(message) => ApiError::validation("username", message),
            SignupError::InvalidEmail(message) => ApiError::validation("email", message),
            SignupError::Conflict => {
                ApiError::Conflict("username or email already in use".to_string())
            }
            SignupError::Store(err) => ApiError::Internal(err),
        }
    }
}

impl From<VerifyError> for ApiError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::UnknownUser => ApiError::NotFound("user"),
            VerifyError::InvalidCode => {
                ApiError::Authentication("invalid confirmation code".to_string())
            }
            VerifyError::Store(err) => ApiError::Internal(err),
        }
    }
}

impl From<UserUpdateError> for ApiError {
    fn from(err: UserUpdateError) -> Self {
        match err {
            UserUpdateError::InvalidUsername(message) => {
                ApiError::validation("username", message)
            }
            UserUpdateError::InvalidEmail(message) => ApiError::validation("email", message),
            UserUpdateError::UsernameTaken => {
                ApiError::Conflict("username already in use".to_string())
            }
            UserUpdateError::EmailTaken => ApiError::Conflict("email already in use".to_string()),
            UserUpdateError::NotFound => ApiError::NotFound("user"),
            UserUpdateError::Store(err) => ApiError::Internal(err),
        }
    }
}
