//! Catalog and review store trait definitions.

use anyhow::Result;

use super::models::{
    Comment, CreateReviewOutcome, Review, SluggedCreateOutcome, SluggedEntry, Title, TitleDraft,
    TitleFilter, TitlePatch, TitleWriteOutcome,
};

/// Storage backend for the browsable catalog: categories, genres, titles.
pub trait CatalogStore: Send + Sync {
    /// Returns all categories, optionally filtered by a name substring.
    fn list_categories(&self, search: Option<&str>) -> Result<Vec<SluggedEntry>>;

    /// Returns Ok(None) if no category carries the slug.
    fn get_category(&self, slug: &str) -> Result<Option<SluggedEntry>>;

    /// Inserts a category. Reports `SlugTaken` on a slug collision.
    fn create_category(&self, entry: SluggedEntry) -> Result<SluggedCreateOutcome>;

    /// Deletes a category by slug; titles referencing it keep existing with
    /// a null category. Returns false if the slug is unknown.
    fn delete_category(&self, slug: &str) -> Result<bool>;

    fn list_genres(&self, search: Option<&str>) -> Result<Vec<SluggedEntry>>;

    fn get_genre(&self, slug: &str) -> Result<Option<SluggedEntry>>;

    fn create_genre(&self, entry: SluggedEntry) -> Result<SluggedCreateOutcome>;

    /// Deletes a genre by slug; its title links are removed with it.
    fn delete_genre(&self, slug: &str) -> Result<bool>;

    /// Returns titles matching the filter, each with its rating aggregated
    /// from reviews at read time.
    fn list_titles(&self, filter: &TitleFilter) -> Result<Vec<Title>>;

    /// Returns Ok(None) if the title does not exist.
    fn get_title(&self, id: i64) -> Result<Option<Title>>;

    /// Creates a title, resolving category and genre slugs. Unknown slugs
    /// are reported back, not persisted.
    fn create_title(&self, draft: &TitleDraft) -> Result<TitleWriteOutcome>;

    /// Applies a partial update to a title.
    fn update_title(&self, id: i64, patch: &TitlePatch) -> Result<TitleWriteOutcome>;

    /// Deletes a title and, by cascade, its reviews and comments.
    /// Returns false if the title does not exist.
    fn delete_title(&self, id: i64) -> Result<bool>;

    fn get_categories_count(&self) -> usize;

    fn get_genres_count(&self) -> usize;

    fn get_titles_count(&self) -> usize;
}

/// Storage backend for reviews and their comments.
pub trait ReviewStore: Send + Sync {
    fn list_reviews(
        &self,
        title_id: i64,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<Review>>;

    /// Returns Ok(None) if the review does not exist under the given title.
    fn get_review(&self, title_id: i64, review_id: i64) -> Result<Option<Review>>;

    /// Inserts a review. The UNIQUE (title_id, author_id) constraint
    /// serializes concurrent creates; a duplicate is reported as
    /// `AlreadyReviewed` and leaves the existing row untouched.
    fn create_review(
        &self,
        title_id: i64,
        author_id: i64,
        text: &str,
        score: i32,
    ) -> Result<CreateReviewOutcome>;

    /// Updates text and/or score of a review. `pub_date` never changes.
    /// Returns Ok(None) if the review does not exist.
    fn update_review(
        &self,
        title_id: i64,
        review_id: i64,
        text: Option<&str>,
        score: Option<i32>,
    ) -> Result<Option<Review>>;

    /// Deletes a review and, by cascade, its comments. Returns false if the
    /// review does not exist under the given title.
    fn delete_review(&self, title_id: i64, review_id: i64) -> Result<bool>;

    fn list_comments(
        &self,
        review_id: i64,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<Comment>>;

    fn get_comment(&self, review_id: i64, comment_id: i64) -> Result<Option<Comment>>;

    fn create_comment(&self, review_id: i64, author_id: i64, text: &str) -> Result<Comment>;

    fn update_comment(&self, review_id: i64, comment_id: i64, text: &str)
        -> Result<Option<Comment>>;

    fn delete_comment(&self, review_id: i64, comment_id: i64) -> Result<bool>;
}

/// Combined trait for the full catalog surface.
pub trait FullCatalogStore: CatalogStore + ReviewStore {}

impl<T: CatalogStore + ReviewStore> FullCatalogStore for T {}
