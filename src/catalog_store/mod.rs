mod models;
mod schema;
mod store;
mod trait_def;
pub mod validation;

pub use models::{
    Comment, CreateReviewOutcome, Review, SluggedCreateOutcome, SluggedEntry, Title, TitleDraft,
    TitleFilter, TitlePatch, TitleWriteOutcome,
};
pub use store::SqliteCatalogStore;
pub use trait_def::{CatalogStore, FullCatalogStore, ReviewStore};
