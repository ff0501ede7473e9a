//! SQLite implementation of the catalog and review stores.

use anyhow::{bail, Context, Result};
use rusqlite::{params, types::Value, Connection};
use std::{
    path::Path,
    sync::{Arc, Mutex},
};
use tracing::info;

use super::models::{
    Comment, CreateReviewOutcome, Review, SluggedCreateOutcome, SluggedEntry, Title, TitleDraft,
    TitleFilter, TitlePatch, TitleWriteOutcome,
};
use super::schema::VERSIONED_SCHEMAS;
use super::trait_def::{CatalogStore, ReviewStore};
use crate::sqlite_persistence::BASE_DB_VERSION;

#[derive(Clone)]
pub struct SqliteCatalogStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCatalogStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = if db_path.as_ref().exists() {
            Connection::open_with_flags(
                db_path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?
        } else {
            let conn = Connection::open(db_path)?;
            VERSIONED_SCHEMAS.last().unwrap().create(&conn)?;
            conn
        };

        // Must be re-enabled on every connection, it is not a db property.
        conn.pragma_update(None, "foreign_keys", true)?;

        let db_version = conn
            .query_row("PRAGMA user_version;", [], |row| row.get::<usize, i64>(0))
            .context("Failed to read catalog database version")?
            - BASE_DB_VERSION as i64;

        if db_version < 0 {
            bail!(
                "Catalog database version {} does not carry the base version marker",
                db_version
            );
        }
        let version = db_version as usize;

        if version >= VERSIONED_SCHEMAS.len() {
            bail!("Catalog database version {} is too new", version);
        }
        VERSIONED_SCHEMAS
            .get(version)
            .context("Failed to get catalog schema")?
            .validate(&conn)?;

        Self::migrate_if_needed(&conn, version)?;

        Ok(SqliteCatalogStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn migrate_if_needed(conn: &Connection, version: usize) -> Result<()> {
        let mut latest_from = version;
        for schema in VERSIONED_SCHEMAS.iter().skip(version + 1) {
            if let Some(migration_fn) = schema.migration {
                info!(
                    "Migrating catalog db from version {} to {}",
                    latest_from, schema.version
                );
                migration_fn(conn)?;
                latest_from = schema.version;
            }
        }
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + latest_from),
            [],
        )?;
        Ok(())
    }

    fn list_slugged(&self, table: &str, search: Option<&str>) -> Result<Vec<SluggedEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut sql = format!("SELECT name, slug FROM {}", table);
        let mut values: Vec<Value> = vec![];
        if let Some(search) = search {
            sql.push_str(" WHERE name LIKE ?1");
            values.push(Value::Text(format!("%{}%", search)));
        }
        sql.push_str(" ORDER BY name");
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(rusqlite::params_from_iter(values), |row| {
                Ok(SluggedEntry {
                    name: row.get(0)?,
                    slug: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn get_slugged(&self, table: &str, slug: &str) -> Result<Option<SluggedEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT name, slug FROM {} WHERE slug = ?1",
            table
        ))?;
        let entry = stmt
            .query_row(params![slug], |row| {
                Ok(SluggedEntry {
                    name: row.get(0)?,
                    slug: row.get(1)?,
                })
            })
            .map(Some)
            .or_else(ignore_no_rows)?;
        Ok(entry)
    }

    fn create_slugged(&self, table: &str, entry: SluggedEntry) -> Result<SluggedCreateOutcome> {
        let conn = self.conn.lock().unwrap();
        let result = conn.execute(
            &format!("INSERT INTO {} (name, slug) VALUES (?1, ?2)", table),
            params![entry.name, entry.slug],
        );
        match result {
            Ok(_) => Ok(SluggedCreateOutcome::Created(entry)),
            Err(err) if is_unique_violation(&err) => Ok(SluggedCreateOutcome::SlugTaken),
            Err(err) => Err(err).with_context(|| format!("Failed to insert into {}", table)),
        }
    }

    fn delete_slugged(&self, table: &str, slug: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            &format!("DELETE FROM {} WHERE slug = ?1", table),
            params![slug],
        )?;
        Ok(deleted > 0)
    }

    fn count(&self, table: &str) -> usize {
        let conn = self.conn.lock().unwrap();
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
            row.get::<_, i64>(0)
        })
        .unwrap_or(0) as usize
    }

    fn title_genres(conn: &Connection, title_id: i64) -> Result<Vec<SluggedEntry>> {
        let mut stmt = conn.prepare(
            "SELECT g.name, g.slug FROM title_genre tg
             JOIN genre g ON g.id = tg.genre_id
             WHERE tg.title_id = ?1 ORDER BY g.name",
        )?;
        let genres = stmt
            .query_map(params![title_id], |row| {
                Ok(SluggedEntry {
                    name: row.get(0)?,
                    slug: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(genres)
    }

    fn read_titles(&self, filter: &TitleFilter) -> Result<Vec<Title>> {
        let conn = self.conn.lock().unwrap();

        let mut sql = String::from(
            "SELECT t.id, t.name, t.year, t.description, c.name, c.slug,
                    (SELECT AVG(score) FROM review WHERE title_id = t.id)
             FROM title t LEFT JOIN category c ON c.id = t.category_id",
        );
        let mut conditions: Vec<String> = vec![];
        let mut values: Vec<Value> = vec![];

        if let Some(name) = &filter.name {
            conditions.push(format!("t.name LIKE ?{}", values.len() + 1));
            values.push(Value::Text(format!("%{}%", name)));
        }
        if let Some(year) = filter.year {
            conditions.push(format!("t.year = ?{}", values.len() + 1));
            values.push(Value::Integer(year as i64));
        }
        if let Some(category) = &filter.category {
            conditions.push(format!("c.slug = ?{}", values.len() + 1));
            values.push(Value::Text(category.clone()));
        }
        if let Some(genre) = &filter.genre {
            conditions.push(format!(
                "EXISTS (SELECT 1 FROM title_genre tg JOIN genre g ON g.id = tg.genre_id
                         WHERE tg.title_id = t.id AND g.slug = ?{})",
                values.len() + 1
            ));
            values.push(Value::Text(genre.clone()));
        }

        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY t.name, t.id");

        if filter.limit.is_some() || filter.offset.is_some() {
            sql.push_str(&format!(" LIMIT ?{}", values.len() + 1));
            values.push(Value::Integer(
                filter.limit.map(|l| l as i64).unwrap_or(-1),
            ));
            if let Some(offset) = filter.offset {
                sql.push_str(&format!(" OFFSET ?{}", values.len() + 1));
                values.push(Value::Integer(offset as i64));
            }
        }

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(values), |row| {
                let category = match (
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ) {
                    (Some(name), Some(slug)) => Some(SluggedEntry { name, slug }),
                    _ => None,
                };
                Ok(Title {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    year: row.get(2)?,
                    description: row.get(3)?,
                    category,
                    rating: row.get(6)?,
                    genre: vec![],
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut titles = rows;
        for title in titles.iter_mut() {
            title.genre = Self::title_genres(&conn, title.id)?;
        }
        Ok(titles)
    }
}

fn slug_id(conn: &Connection, table: &str, slug: &str) -> Result<Option<i64>> {
    let id = conn
        .query_row(
            &format!("SELECT id FROM {} WHERE slug = ?1", table),
            params![slug],
            |row| row.get::<_, i64>(0),
        )
        .map(Some)
        .or_else(ignore_no_rows)?;
    Ok(id)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn ignore_no_rows<T>(err: rusqlite::Error) -> Result<Option<T>, rusqlite::Error> {
    match err {
        rusqlite::Error::QueryReturnedNoRows => Ok(None),
        other => Err(other),
    }
}

fn review_from_row(row: &rusqlite::Row) -> Result<Review, rusqlite::Error> {
    Ok(Review {
        id: row.get(0)?,
        title_id: row.get(1)?,
        author_id: row.get(2)?,
        text: row.get(3)?,
        score: row.get(4)?,
        pub_date: row.get(5)?,
    })
}

fn comment_from_row(row: &rusqlite::Row) -> Result<Comment, rusqlite::Error> {
    Ok(Comment {
        id: row.get(0)?,
        review_id: row.get(1)?,
        author_id: row.get(2)?,
        text: row.get(3)?,
        pub_date: row.get(4)?,
    })
}

impl CatalogStore for SqliteCatalogStore {
    fn list_categories(&self, search: Option<&str>) -> Result<Vec<SluggedEntry>> {
        self.list_slugged("category", search)
    }

    fn get_category(&self, slug: &str) -> Result<Option<SluggedEntry>> {
        self.get_slugged("category", slug)
    }

    fn create_category(&self, entry: SluggedEntry) -> Result<SluggedCreateOutcome> {
        self.create_slugged("category", entry)
    }

    fn delete_category(&self, slug: &str) -> Result<bool> {
        self.delete_slugged("category", slug)
    }

    fn list_genres(&self, search: Option<&str>) -> Result<Vec<SluggedEntry>> {
        self.list_slugged("genre", search)
    }

    fn get_genre(&self, slug: &str) -> Result<Option<SluggedEntry>> {
        self.get_slugged("genre", slug)
    }

    fn create_genre(&self, entry: SluggedEntry) -> Result<SluggedCreateOutcome> {
        self.create_slugged("genre", entry)
    }

    fn delete_genre(&self, slug: &str) -> Result<bool> {
        self.delete_slugged("genre", slug)
    }

    fn list_titles(&self, filter: &TitleFilter) -> Result<Vec<Title>> {
        self.read_titles(filter)
    }

    fn get_title(&self, id: i64) -> Result<Option<Title>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT t.id, t.name, t.year, t.description, c.name, c.slug,
                        (SELECT AVG(score) FROM review WHERE title_id = t.id)
                 FROM title t LEFT JOIN category c ON c.id = t.category_id
                 WHERE t.id = ?1",
                params![id],
                |row| {
                    let category = match (
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, Option<String>>(5)?,
                    ) {
                        (Some(name), Some(slug)) => Some(SluggedEntry { name, slug }),
                        _ => None,
                    };
                    Ok(Title {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        year: row.get(2)?,
                        description: row.get(3)?,
                        category,
                        rating: row.get(6)?,
                        genre: vec![],
                    })
                },
            )
            .map(Some)
            .or_else(ignore_no_rows)?;

        match row {
            Some(mut title) => {
                title.genre = Self::title_genres(&conn, title.id)?;
                Ok(Some(title))
            }
            None => Ok(None),
        }
    }

    fn create_title(&self, draft: &TitleDraft) -> Result<TitleWriteOutcome> {
        let title_id = {
            let mut conn = self.conn.lock().unwrap();
            let tx = conn.transaction()?;

            let category_id = match &draft.category {
                Some(slug) => match slug_id(&tx, "category", slug)? {
                    Some(id) => Some(id),
                    None => return Ok(TitleWriteOutcome::UnknownCategory(slug.clone())),
                },
                None => None,
            };

            tx.execute(
                "INSERT INTO title (name, year, description, category_id) VALUES (?1, ?2, ?3, ?4)",
                params![draft.name, draft.year, draft.description, category_id],
            )?;
            let title_id = tx.last_insert_rowid();

            for slug in &draft.genre {
                let genre_id = match slug_id(&tx, "genre", slug)? {
                    Some(id) => id,
                    None => return Ok(TitleWriteOutcome::UnknownGenre(slug.clone())),
                };
                tx.execute(
                    "INSERT OR IGNORE INTO title_genre (title_id, genre_id) VALUES (?1, ?2)",
                    params![title_id, genre_id],
                )?;
            }

            tx.commit()?;
            title_id
        };

        Ok(self
            .get_title(title_id)?
            .map(TitleWriteOutcome::Done)
            .unwrap_or(TitleWriteOutcome::NotFound))
    }

    fn update_title(&self, id: i64, patch: &TitlePatch) -> Result<TitleWriteOutcome> {
        {
            let mut conn = self.conn.lock().unwrap();
            let tx = conn.transaction()?;

            let current = tx
                .query_row(
                    "SELECT name, year, description, category_id FROM title WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, i32>(1)?,
                            row.get::<_, Option<String>>(2)?,
                            row.get::<_, Option<i64>>(3)?,
                        ))
                    },
                )
                .map(Some)
                .or_else(ignore_no_rows)?;

            let (mut name, mut year, mut description, mut category_id) = match current {
                Some(x) => x,
                None => return Ok(TitleWriteOutcome::NotFound),
            };

            if let Some(new_name) = &patch.name {
                name = new_name.clone();
            }
            if let Some(new_year) = patch.year {
                year = new_year;
            }
            if let Some(new_description) = &patch.description {
                description = Some(new_description.clone());
            }
            if let Some(slug) = &patch.category {
                category_id = match slug_id(&tx, "category", slug)? {
                    Some(id) => Some(id),
                    None => return Ok(TitleWriteOutcome::UnknownCategory(slug.clone())),
                };
            }

            tx.execute(
                "UPDATE title SET name = ?1, year = ?2, description = ?3, category_id = ?4
                 WHERE id = ?5",
                params![name, year, description, category_id, id],
            )?;

            if let Some(genre_slugs) = &patch.genre {
                tx.execute("DELETE FROM title_genre WHERE title_id = ?1", params![id])?;
                for slug in genre_slugs {
                    let genre_id = match slug_id(&tx, "genre", slug)? {
                        Some(genre_id) => genre_id,
                        None => return Ok(TitleWriteOutcome::UnknownGenre(slug.clone())),
                    };
                    tx.execute(
                        "INSERT OR IGNORE INTO title_genre (title_id, genre_id) VALUES (?1, ?2)",
                        params![id, genre_id],
                    )?;
                }
            }

            tx.commit()?;
        }

        Ok(self
            .get_title(id)?
            .map(TitleWriteOutcome::Done)
            .unwrap_or(TitleWriteOutcome::NotFound))
    }

    fn delete_title(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM title WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    fn get_categories_count(&self) -> usize {
        self.count("category")
    }

    fn get_genres_count(&self) -> usize {
        self.count("genre")
    }

    fn get_titles_count(&self) -> usize {
        self.count("title")
    }
}

impl ReviewStore for SqliteCatalogStore {
    fn list_reviews(
        &self,
        title_id: i64,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<Review>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, title_id, author_id, text, score, pub_date FROM review
             WHERE title_id = ?1 ORDER BY pub_date, id LIMIT ?2 OFFSET ?3",
        )?;
        let reviews = stmt
            .query_map(
                params![
                    title_id,
                    limit.map(|l| l as i64).unwrap_or(-1),
                    offset.map(|o| o as i64).unwrap_or(0)
                ],
                review_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reviews)
    }

    fn get_review(&self, title_id: i64, review_id: i64) -> Result<Option<Review>> {
        let conn = self.conn.lock().unwrap();
        let review = conn
            .query_row(
                "SELECT id, title_id, author_id, text, score, pub_date FROM review
                 WHERE id = ?1 AND title_id = ?2",
                params![review_id, title_id],
                review_from_row,
            )
            .map(Some)
            .or_else(ignore_no_rows)?;
        Ok(review)
    }

    fn create_review(
        &self,
        title_id: i64,
        author_id: i64,
        text: &str,
        score: i32,
    ) -> Result<CreateReviewOutcome> {
        let review_id = {
            let conn = self.conn.lock().unwrap();
            let result = conn.execute(
                "INSERT INTO review (title_id, author_id, text, score) VALUES (?1, ?2, ?3, ?4)",
                params![title_id, author_id, text, score],
            );
            match result {
                Ok(_) => conn.last_insert_rowid(),
                Err(err) if is_unique_violation(&err) => {
                    return Ok(CreateReviewOutcome::AlreadyReviewed)
                }
                Err(err) => return Err(err).context("Failed to insert review"),
            }
        };

        let review = self
            .get_review(title_id, review_id)?
            .context("Review vanished right after insert")?;
        Ok(CreateReviewOutcome::Created(review))
    }

    fn update_review(
        &self,
        title_id: i64,
        review_id: i64,
        text: Option<&str>,
        score: Option<i32>,
    ) -> Result<Option<Review>> {
        {
            let conn = self.conn.lock().unwrap();
            if let Some(text) = text {
                conn.execute(
                    "UPDATE review SET text = ?1 WHERE id = ?2 AND title_id = ?3",
                    params![text, review_id, title_id],
                )?;
            }
            if let Some(score) = score {
                conn.execute(
                    "UPDATE review SET score = ?1 WHERE id = ?2 AND title_id = ?3",
                    params![score, review_id, title_id],
                )?;
            }
        }
        self.get_review(title_id, review_id)
    }

    fn delete_review(&self, title_id: i64, review_id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM review WHERE id = ?1 AND title_id = ?2",
            params![review_id, title_id],
        )?;
        Ok(deleted > 0)
    }

    fn list_comments(
        &self,
        review_id: i64,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<Comment>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, review_id, author_id, text, pub_date FROM comment
             WHERE review_id = ?1 ORDER BY pub_date, id LIMIT ?2 OFFSET ?3",
        )?;
        let comments = stmt
            .query_map(
                params![
                    review_id,
                    limit.map(|l| l as i64).unwrap_or(-1),
                    offset.map(|o| o as i64).unwrap_or(0)
                ],
                comment_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    fn get_comment(&self, review_id: i64, comment_id: i64) -> Result<Option<Comment>> {
        let conn = self.conn.lock().unwrap();
        let comment = conn
            .query_row(
                "SELECT id, review_id, author_id, text, pub_date FROM comment
                 WHERE id = ?1 AND review_id = ?2",
                params![comment_id, review_id],
                comment_from_row,
            )
            .map(Some)
            .or_else(ignore_no_rows)?;
        Ok(comment)
    }

    fn create_comment(&self, review_id: i64, author_id: i64, text: &str) -> Result<Comment> {
        let comment_id = {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO comment (review_id, author_id, text) VALUES (?1, ?2, ?3)",
                params![review_id, author_id, text],
            )?;
            conn.last_insert_rowid()
        };
        self.get_comment(review_id, comment_id)?
            .context("Comment vanished right after insert")
    }

    fn update_comment(
        &self,
        review_id: i64,
        comment_id: i64,
        text: &str,
    ) -> Result<Option<Comment>> {
        {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "UPDATE comment SET text = ?1 WHERE id = ?2 AND review_id = ?3",
                params![text, comment_id, review_id],
            )?;
        }
        self.get_comment(review_id, comment_id)
    }

    fn delete_comment(&self, review_id: i64, comment_id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM comment WHERE id = ?1 AND review_id = ?2",
            params![comment_id, review_id],
        )?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, SqliteCatalogStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteCatalogStore::new(dir.path().join("catalog.db")).unwrap();
        (dir, store)
    }

    fn entry(name: &str, slug: &str) -> SluggedEntry {
        SluggedEntry {
            name: name.to_string(),
            slug: slug.to_string(),
        }
    }

    fn seed_title(store: &SqliteCatalogStore) -> i64 {
        store
            .create_category(entry("Films", "films"))
            .unwrap();
        store.create_genre(entry("Drama", "drama")).unwrap();
        let outcome = store
            .create_title(&TitleDraft {
                name: "The Long Night".to_string(),
                year: 1999,
                description: Some("A film".to_string()),
                genre: vec!["drama".to_string()],
                category: Some("films".to_string()),
            })
            .unwrap();
        match outcome {
            TitleWriteOutcome::Done(title) => title.id,
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn category_slug_collision_is_reported() {
        let (_dir, store) = test_store();
        store.create_category(entry("Films", "films")).unwrap();
        let outcome = store
            .create_category(entry("Other films", "films"))
            .unwrap();
        assert!(matches!(outcome, SluggedCreateOutcome::SlugTaken));
        assert_eq!(store.get_categories_count(), 1);
    }

    #[test]
    fn deleting_category_nulls_title_category() {
        let (_dir, store) = test_store();
        let title_id = seed_title(&store);

        assert!(store.delete_category("films").unwrap());

        let title = store.get_title(title_id).unwrap().unwrap();
        assert!(title.category.is_none());
        assert_eq!(title.name, "The Long Night");
    }

    #[test]
    fn deleting_genre_removes_links_but_not_titles() {
        let (_dir, store) = test_store();
        let title_id = seed_title(&store);

        assert!(store.delete_genre("drama").unwrap());

        let title = store.get_title(title_id).unwrap().unwrap();
        assert!(title.genre.is_empty());
    }

    #[test]
    fn unknown_genre_slug_is_reported_and_nothing_persisted() {
        let (_dir, store) = test_store();
        store.create_category(entry("Films", "films")).unwrap();
        let outcome = store
            .create_title(&TitleDraft {
                name: "No Such Genre".to_string(),
                year: 2000,
                description: None,
                genre: vec!["unknown".to_string()],
                category: Some("films".to_string()),
            })
            .unwrap();
        assert!(matches!(outcome, TitleWriteOutcome::UnknownGenre(slug) if slug == "unknown"));
        assert_eq!(store.get_titles_count(), 0);
    }

    #[test]
    fn rating_is_null_without_reviews_and_mean_with() {
        let (_dir, store) = test_store();
        let title_id = seed_title(&store);

        let title = store.get_title(title_id).unwrap().unwrap();
        assert_eq!(title.rating, None);

        store.create_review(title_id, 1, "good", 10).unwrap();
        store.create_review(title_id, 2, "meh", 5).unwrap();
        store.create_review(title_id, 3, "ok", 6).unwrap();

        let title = store.get_title(title_id).unwrap().unwrap();
        assert_eq!(title.rating, Some(7.0));
    }

    #[test]
    fn second_review_by_same_author_conflicts() {
        let (_dir, store) = test_store();
        let title_id = seed_title(&store);

        let first = store.create_review(title_id, 7, "first", 8).unwrap();
        assert!(matches!(first, CreateReviewOutcome::Created(_)));

        let second = store.create_review(title_id, 7, "second", 2).unwrap();
        assert!(matches!(second, CreateReviewOutcome::AlreadyReviewed));

        let reviews = store.list_reviews(title_id, None, None).unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].text, "first");
        assert_eq!(reviews[0].score, 8);
    }

    #[test]
    fn same_author_can_review_different_titles() {
        let (_dir, store) = test_store();
        let first_title = seed_title(&store);
        let other = store
            .create_title(&TitleDraft {
                name: "Another".to_string(),
                year: 2001,
                description: None,
                genre: vec![],
                category: None,
            })
            .unwrap();
        let second_title = match other {
            TitleWriteOutcome::Done(t) => t.id,
            _ => unreachable!(),
        };

        assert!(matches!(
            store.create_review(first_title, 7, "a", 5).unwrap(),
            CreateReviewOutcome::Created(_)
        ));
        assert!(matches!(
            store.create_review(second_title, 7, "b", 5).unwrap(),
            CreateReviewOutcome::Created(_)
        ));
    }

    #[test]
    fn deleting_review_allows_a_new_one_and_drops_comments() {
        let (_dir, store) = test_store();
        let title_id = seed_title(&store);

        let review = match store.create_review(title_id, 7, "first", 8).unwrap() {
            CreateReviewOutcome::Created(review) => review,
            _ => unreachable!(),
        };
        store.create_comment(review.id, 9, "nice take").unwrap();

        assert!(store.delete_review(title_id, review.id).unwrap());
        assert!(store
            .list_comments(review.id, None, None)
            .unwrap()
            .is_empty());

        assert!(matches!(
            store.create_review(title_id, 7, "again", 3).unwrap(),
            CreateReviewOutcome::Created(_)
        ));
    }

    #[test]
    fn review_update_keeps_pub_date() {
        let (_dir, store) = test_store();
        let title_id = seed_title(&store);
        let review = match store.create_review(title_id, 7, "first", 8).unwrap() {
            CreateReviewOutcome::Created(review) => review,
            _ => unreachable!(),
        };

        let updated = store
            .update_review(title_id, review.id, Some("revised"), Some(4))
            .unwrap()
            .unwrap();
        assert_eq!(updated.text, "revised");
        assert_eq!(updated.score, 4);
        assert_eq!(updated.pub_date, review.pub_date);
    }

    #[test]
    fn title_filters_narrow_results() {
        let (_dir, store) = test_store();
        seed_title(&store);
        store.create_genre(entry("Comedy", "comedy")).unwrap();
        store
            .create_title(&TitleDraft {
                name: "Light Laughs".to_string(),
                year: 2005,
                description: None,
                genre: vec!["comedy".to_string()],
                category: None,
            })
            .unwrap();

        let by_genre = store
            .list_titles(&TitleFilter {
                genre: Some("comedy".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_genre.len(), 1);
        assert_eq!(by_genre[0].name, "Light Laughs");

        let by_year = store
            .list_titles(&TitleFilter {
                year: Some(1999),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_year.len(), 1);
        assert_eq!(by_year[0].name, "The Long Night");

        let by_name = store
            .list_titles(&TitleFilter {
                name: Some("Night".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_name.len(), 1);

        let by_category = store
            .list_titles(&TitleFilter {
                category: Some("films".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_category.len(), 1);

        let all = store.list_titles(&TitleFilter::default()).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn title_list_pagination() {
        let (_dir, store) = test_store();
        for i in 0..5 {
            store
                .create_title(&TitleDraft {
                    name: format!("Title {}", i),
                    year: 2000 + i,
                    description: None,
                    genre: vec![],
                    category: None,
                })
                .unwrap();
        }

        let page = store
            .list_titles(&TitleFilter {
                limit: Some(2),
                offset: Some(2),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].name, "Title 2");
    }

    #[test]
    fn update_title_replaces_genres() {
        let (_dir, store) = test_store();
        let title_id = seed_title(&store);
        store.create_genre(entry("Comedy", "comedy")).unwrap();

        let outcome = store
            .update_title(
                title_id,
                &TitlePatch {
                    genre: Some(vec!["comedy".to_string()]),
                    ..Default::default()
                },
            )
            .unwrap();
        let title = match outcome {
            TitleWriteOutcome::Done(title) => title,
            other => panic!("unexpected outcome: {:?}", other),
        };
        assert_eq!(title.genre.len(), 1);
        assert_eq!(title.genre[0].slug, "comedy");
    }
}
