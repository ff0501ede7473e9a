//! SQLite schema for the catalog database: categories, genres, titles,
//! the title↔genre link table, reviews and comments.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};

const CATEGORY_TABLE_V_0: Table = Table {
    name: "category",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("slug", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[],
    indices: &[("idx_category_slug", "slug")],
};

const GENRE_TABLE_V_0: Table = Table {
    name: "genre",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("slug", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[],
    indices: &[("idx_genre_slug", "slug")],
};

// Deleting a category orphans its titles instead of removing them.
const TITLE_CATEGORY_FK: ForeignKey = ForeignKey {
    foreign_table: "category",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::SetNull,
};

const TITLE_TABLE_V_0: Table = Table {
    name: "title",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("year", &SqlType::Integer, non_null = true),
        sqlite_column!("description", &SqlType::Text),
        sqlite_column!(
            "category_id",
            &SqlType::Integer,
            foreign_key = Some(&TITLE_CATEGORY_FK)
        ),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[],
    indices: &[("idx_title_category_id", "category_id")],
};

const TITLE_GENRE_TITLE_FK: ForeignKey = ForeignKey {
    foreign_table: "title",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const TITLE_GENRE_GENRE_FK: ForeignKey = ForeignKey {
    foreign_table: "genre",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const TITLE_GENRE_TABLE_V_0: Table = Table {
    name: "title_genre",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "title_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&TITLE_GENRE_TITLE_FK)
        ),
        sqlite_column!(
            "genre_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&TITLE_GENRE_GENRE_FK)
        ),
    ],
    unique_constraints: &[&["title_id", "genre_id"]],
    indices: &[
        ("idx_title_genre_title_id", "title_id"),
        ("idx_title_genre_genre_id", "genre_id"),
    ],
};

const REVIEW_TITLE_FK: ForeignKey = ForeignKey {
    foreign_table: "title",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const REVIEW_TABLE_V_0: Table = Table {
    name: "review",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "title_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&REVIEW_TITLE_FK)
        ),
        // author ids live in the user database, no FK across files
        sqlite_column!("author_id", &SqlType::Integer, non_null = true),
        sqlite_column!("text", &SqlType::Text, non_null = true),
        sqlite_column!("score", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "pub_date",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    // one review per author per title
    unique_constraints: &[&["title_id", "author_id"]],
    indices: &[("idx_review_title_id", "title_id")],
};

const COMMENT_REVIEW_FK: ForeignKey = ForeignKey {
    foreign_table: "review",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const COMMENT_TABLE_V_0: Table = Table {
    name: "comment",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "review_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&COMMENT_REVIEW_FK)
        ),
        sqlite_column!("author_id", &SqlType::Integer, non_null = true),
        sqlite_column!("text", &SqlType::Text, non_null = true),
        sqlite_column!(
            "pub_date",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[],
    indices: &[("idx_comment_review_id", "review_id")],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        CATEGORY_TABLE_V_0,
        GENRE_TABLE_V_0,
        TITLE_TABLE_V_0,
        TITLE_GENRE_TABLE_V_0,
        REVIEW_TABLE_V_0,
        COMMENT_TABLE_V_0,
    ],
    migration: None,
}];
