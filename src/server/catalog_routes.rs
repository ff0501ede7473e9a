//! Category, genre and title endpoints. Reads are public, writes require
//! the catalog-edit capability.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;

use super::error::ApiError;
use super::session::Session;
use super::state::{GuardedCatalogStore, ServerState};
use crate::catalog_store::validation::{
    derive_slug, validate_slugged, validate_title_name, validate_year,
};
use crate::catalog_store::{
    CatalogStore, SluggedCreateOutcome, SluggedEntry, Title, TitleDraft, TitleFilter, TitlePatch,
    TitleWriteOutcome,
};
use crate::user::Permission;

#[derive(Deserialize, Debug)]
struct SearchQuery {
    search: Option<String>,
}

#[derive(Deserialize, Debug)]
struct SluggedBody {
    name: String,
    slug: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct TitleListQuery {
    name: Option<String>,
    year: Option<i32>,
    category: Option<String>,
    genre: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

fn require_catalog_editor(session: &Session) -> Result<(), ApiError> {
    if session.has_permission(Permission::EditCatalog) {
        Ok(())
    } else {
        Err(ApiError::PermissionDenied)
    }
}

// ============================================================================
// Categories and genres (same shape, two tables)
// ============================================================================

fn prepared_slugged_entry(body: SluggedBody) -> Result<SluggedEntry, ApiError> {
    let slug = match body.slug {
        Some(slug) => slug,
        None => derive_slug(&body.name),
    };
    validate_slugged(&body.name, &slug).map_err(ApiError::from_issues)?;
    Ok(SluggedEntry {
        name: body.name,
        slug,
    })
}

async fn list_categories(
    State(catalog_store): State<GuardedCatalogStore>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<SluggedEntry>>, ApiError> {
    let categories = catalog_store.list_categories(query.search.as_deref())?;
    Ok(Json(categories))
}

async fn create_category(
    session: Session,
    State(catalog_store): State<GuardedCatalogStore>,
    Json(body): Json<SluggedBody>,
) -> Result<Response, ApiError> {
    require_catalog_editor(&session)?;
    let entry = prepared_slugged_entry(body)?;
    match catalog_store.create_category(entry)? {
        SluggedCreateOutcome::Created(entry) => {
            Ok((StatusCode::CREATED, Json(entry)).into_response())
        }
        SluggedCreateOutcome::SlugTaken => {
            Err(ApiError::Conflict("category slug already in use".to_string()))
        }
    }
}

async fn delete_category(
    session: Session,
    State(catalog_store): State<GuardedCatalogStore>,
    Path(slug): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_catalog_editor(&session)?;
    if catalog_store.delete_category(&slug)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("category"))
    }
}

async fn list_genres(
    State(catalog_store): State<GuardedCatalogStore>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<SluggedEntry>>, ApiError> {
    let genres = catalog_store.list_genres(query.search.as_deref())?;
    Ok(Json(genres))
}

async fn create_genre(
    session: Session,
    State(catalog_store): State<GuardedCatalogStore>,
    Json(body): Json<SluggedBody>,
) -> Result<Response, ApiError> {
    require_catalog_editor(&session)?;
    let entry = prepared_slugged_entry(body)?;
    match catalog_store.create_genre(entry)? {
        SluggedCreateOutcome::Created(entry) => {
            Ok((StatusCode::CREATED, Json(entry)).into_response())
        }
        SluggedCreateOutcome::SlugTaken => {
            Err(ApiError::Conflict("genre slug already in use".to_string()))
        }
    }
}

async fn delete_genre(
    session: Session,
    State(catalog_store): State<GuardedCatalogStore>,
    Path(slug): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_catalog_editor(&session)?;
    if catalog_store.delete_genre(&slug)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("genre"))
    }
}

// ============================================================================
// Titles
// ============================================================================

fn title_outcome_to_result(outcome: TitleWriteOutcome) -> Result<Title, ApiError> {
    match outcome {
        TitleWriteOutcome::Done(title) => Ok(title),
        TitleWriteOutcome::NotFound => Err(ApiError::NotFound("title")),
        TitleWriteOutcome::UnknownCategory(slug) => Err(ApiError::validation(
            "category",
            format!("unknown category slug \"{}\"", slug),
        )),
        TitleWriteOutcome::UnknownGenre(slug) => Err(ApiError::validation(
            "genre",
            format!("unknown genre slug \"{}\"", slug),
        )),
    }
}

async fn list_titles(
    State(catalog_store): State<GuardedCatalogStore>,
    Query(query): Query<TitleListQuery>,
) -> Result<Json<Vec<Title>>, ApiError> {
    let filter = TitleFilter {
        name: query.name,
        year: query.year,
        category: query.category,
        genre: query.genre,
        limit: query.limit,
        offset: query.offset,
    };
    let titles = catalog_store.list_titles(&filter)?;
    Ok(Json(titles))
}

async fn get_title(
    State(catalog_store): State<GuardedCatalogStore>,
    Path(id): Path<i64>,
) -> Result<Json<Title>, ApiError> {
    match catalog_store.get_title(id)? {
        Some(title) => Ok(Json(title)),
        None => Err(ApiError::NotFound("title")),
    }
}

async fn create_title(
    session: Session,
    State(catalog_store): State<GuardedCatalogStore>,
    Json(draft): Json<TitleDraft>,
) -> Result<Response, ApiError> {
    require_catalog_editor(&session)?;
    validate_title_name(&draft.name).map_err(ApiError::from_issues)?;
    validate_year(draft.year).map_err(ApiError::from_issues)?;

    let title = title_outcome_to_result(catalog_store.create_title(&draft)?)?;
    Ok((StatusCode::CREATED, Json(title)).into_response())
}

async fn patch_title(
    session: Session,
    State(catalog_store): State<GuardedCatalogStore>,
    Path(id): Path<i64>,
    Json(patch): Json<TitlePatch>,
) -> Result<Json<Title>, ApiError> {
    require_catalog_editor(&session)?;
    if let Some(name) = &patch.name {
        validate_title_name(name).map_err(ApiError::from_issues)?;
    }
    if let Some(year) = patch.year {
        validate_year(year).map_err(ApiError::from_issues)?;
    }

    let title = title_outcome_to_result(catalog_store.update_title(id, &patch)?)?;
    Ok(Json(title))
}

async fn delete_title(
    session: Session,
    State(catalog_store): State<GuardedCatalogStore>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    require_catalog_editor(&session)?;
    if catalog_store.delete_title(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("title"))
    }
}

pub fn make_catalog_routes(state: ServerState) -> Router {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route("/categories/{slug}", delete(delete_category))
        .route("/genres", get(list_genres).post(create_genre))
        .route("/genres/{slug}", delete(delete_genre))
        .route("/titles", get(list_titles).post(create_title))
        // the parameter name must match the nested review routes, the
        // router requires one name per path position
        .route(
            "/titles/{title_id}",
            get(get_title).patch(patch_title).delete(delete_title),
        )
        .with_state(state)
}
