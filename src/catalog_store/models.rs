//! Catalog data models

use serde::{Deserialize, Serialize};

/// The shared name+slug shape of categories and genres. Both resources are
/// stored in their own tables but carry exactly this value object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SluggedEntry {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Title {
    pub id: i64,
    pub name: String,
    pub year: i32,
    /// Average review score, recomputed on every read. Null when the title
    /// has no reviews, never zero.
    pub rating: Option<f64>,
    pub description: Option<String>,
    pub genre: Vec<SluggedEntry>,
    pub category: Option<SluggedEntry>,
}

/// Payload for creating a title. Genres and category are referenced by slug.
#[derive(Debug, Clone, Deserialize)]
pub struct TitleDraft {
    pub name: String,
    pub year: i32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub genre: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Partial title update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitlePatch {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub description: Option<String>,
    pub genre: Option<Vec<String>>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TitleFilter {
    /// Substring match on the title name.
    pub name: Option<String>,
    pub year: Option<i32>,
    /// Category slug.
    pub category: Option<String>,
    /// Genre slug.
    pub genre: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Review {
    pub id: i64,
    pub title_id: i64,
    pub author_id: i64,
    pub text: String,
    pub score: i32,
    /// Unix timestamp, set at creation and immutable afterwards.
    pub pub_date: i64,
}

#[derive(Debug, Clone)]
pub struct Comment {
    pub id: i64,
    pub review_id: i64,
    pub author_id: i64,
    pub text: String,
    pub pub_date: i64,
}

/// Result of inserting a category or genre. The slug uniqueness constraint
/// lives in the database, so the store reports the collision explicitly
/// instead of surfacing a raw constraint error.
#[derive(Debug)]
pub enum SluggedCreateOutcome {
    Created(SluggedEntry),
    SlugTaken,
}

/// Result of creating or updating a title. Unknown slugs are reported back
/// so the caller can turn them into field-level validation errors.
#[derive(Debug)]
pub enum TitleWriteOutcome {
    Done(Title),
    NotFound,
    UnknownCategory(String),
    UnknownGenre(String),
}

/// Result of inserting a review. `AlreadyReviewed` maps the UNIQUE
/// (title_id, author_id) violation: an author gets one review per title.
#[derive(Debug)]
pub enum CreateReviewOutcome {
    Created(Review),
    AlreadyReviewed,
}
