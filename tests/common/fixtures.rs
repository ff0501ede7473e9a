//! Test fixture creation for the catalog and user databases.
//!
//! The catalog rows are inserted with direct SQL so the seeded ids are
//! stable across runs; the user fixtures go through the store so role and
//! token handling stay on the real code path.

use super::constants::*;
use anyhow::Result;
use recensio_review_server::catalog_store::SqliteCatalogStore;
use recensio_review_server::user::auth::{AuthToken, AuthTokenValue};
use recensio_review_server::user::{SqliteUserStore, UserAuthTokenStore, UserRole, UserStore};
use rusqlite::Connection;
use std::path::PathBuf;
use std::time::SystemTime;
use tempfile::TempDir;

/// Creates a temporary catalog database with 2 categories, 2 genres and
/// 2 titles. Returns (temp_dir, catalog_db_path).
pub fn create_test_catalog() -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let catalog_db_path = dir.path().join("catalog.db");

    // Initialize the store (creates the schema), then seed with direct SQL
    // so the ids in constants.rs stay stable.
    let _store = SqliteCatalogStore::new(&catalog_db_path)?;

    let conn = Connection::open(&catalog_db_path)?;

    conn.execute(
        "INSERT INTO category (id, name, slug) VALUES (1, ?1, ?2)",
        [CATEGORY_FILMS_NAME, CATEGORY_FILMS_SLUG],
    )?;
    conn.execute(
        "INSERT INTO category (id, name, slug) VALUES (2, ?1, ?2)",
        [CATEGORY_BOOKS_NAME, CATEGORY_BOOKS_SLUG],
    )?;

    conn.execute(
        "INSERT INTO genre (id, name, slug) VALUES (1, ?1, ?2)",
        [GENRE_DRAMA_NAME, GENRE_DRAMA_SLUG],
    )?;
    conn.execute(
        "INSERT INTO genre (id, name, slug) VALUES (2, ?1, ?2)",
        [GENRE_COMEDY_NAME, GENRE_COMEDY_SLUG],
    )?;

    conn.execute(
        "INSERT INTO title (id, name, year, description, category_id) VALUES (?1, ?2, ?3, ?4, 1)",
        rusqlite::params![TITLE_1_ID, TITLE_1_NAME, TITLE_1_YEAR, "A film about a night"],
    )?;
    conn.execute(
        "INSERT INTO title (id, name, year, description, category_id) VALUES (?1, ?2, ?3, NULL, 2)",
        rusqlite::params![TITLE_2_ID, TITLE_2_NAME, TITLE_2_YEAR],
    )?;

    conn.execute(
        "INSERT INTO title_genre (title_id, genre_id) VALUES (?1, 1)",
        [TITLE_1_ID],
    )?;
    conn.execute(
        "INSERT INTO title_genre (title_id, genre_id) VALUES (?1, 2)",
        [TITLE_2_ID],
    )?;

    Ok((dir, catalog_db_path))
}

/// Creates a temporary user database with one user per role, each carrying
/// a known auth token.
pub fn create_test_db_with_users() -> Result<(TempDir, PathBuf)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("user.db");

    {
        let store = SqliteUserStore::new(&db_path)?;

        create_user_with_token(&store, TEST_USER, TEST_USER_EMAIL, UserRole::User, TEST_USER_TOKEN)?;
        create_user_with_token(
            &store,
            OTHER_USER,
            OTHER_USER_EMAIL,
            UserRole::User,
            OTHER_USER_TOKEN,
        )?;
        create_user_with_token(
            &store,
            MODERATOR_USER,
            MODERATOR_EMAIL,
            UserRole::Moderator,
            MODERATOR_TOKEN,
        )?;
        create_user_with_token(&store, ADMIN_USER, ADMIN_EMAIL, UserRole::Admin, ADMIN_TOKEN)?;
    }

    Ok((temp_dir, db_path))
}

/// Creates an active user with the given role and a pre-minted auth token.
pub fn create_user_with_token(
    store: &SqliteUserStore,
    username: &str,
    email: &str,
    role: UserRole,
    token: &str,
) -> Result<i64> {
    let user_id = store.create_user(username, email, role)?;

    store.add_user_auth_token(AuthToken {
        user_id,
        created: SystemTime::now(),
        last_used: None,
        value: AuthTokenValue(token.to_string()),
    })?;

    Ok(user_id)
}
