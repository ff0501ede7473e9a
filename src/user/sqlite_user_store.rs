use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema, BASE_DB_VERSION,
    DEFAULT_TIMESTAMP,
};
use anyhow::{bail, Context, Result};
use rusqlite::{params, types::Value, Connection};
use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, Mutex},
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tracing::info;

use super::auth::{AuthToken, AuthTokenValue};
use super::permissions::UserRole;
use super::user_models::{User, UserPatch};
use super::user_store::{
    PendingSignupOutcome, UserAuthTokenStore, UserStore, UserUpdateOutcome,
};

/// V 0
const USER_TABLE_V_0: Table = Table {
    name: "user",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("username", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("email", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "role",
            &SqlType::Text,
            non_null = true,
            default_value = Some("'user'")
        ),
        sqlite_column!("first_name", &SqlType::Text),
        sqlite_column!("last_name", &SqlType::Text),
        sqlite_column!("bio", &SqlType::Text),
        sqlite_column!(
            "is_active",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "is_superuser",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("confirmation_code_digest", &SqlType::Text),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[],
    indices: &[
        ("idx_user_username", "username"),
        ("idx_user_email", "email"),
    ],
};

const AUTH_TOKEN_USER_FK: ForeignKey = ForeignKey {
    foreign_table: "user",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const AUTH_TOKEN_TABLE_V_0: Table = Table {
    name: "auth_token",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&AUTH_TOKEN_USER_FK)
        ),
        sqlite_column!("value", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("last_used", &SqlType::Integer),
    ],
    unique_constraints: &[],
    indices: &[("idx_auth_token_value", "value")],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[USER_TABLE_V_0, AUTH_TOKEN_TABLE_V_0],
    migration: None,
}];

fn to_unix(t: SystemTime) -> i64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn from_unix(secs: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs.max(0) as u64)
}

fn user_from_row(row: &rusqlite::Row) -> Result<User, rusqlite::Error> {
    let role_str: String = row.get(3)?;
    let role = UserRole::from_str(&role_str).unwrap_or(UserRole::User);
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        role,
        first_name: row.get(4)?,
        last_name: row.get(5)?,
        bio: row.get(6)?,
        is_active: row.get::<_, i32>(7)? != 0,
        is_superuser: row.get::<_, i32>(8)? != 0,
    })
}

const USER_COLUMNS: &str =
    "id, username, email, role, first_name, last_name, bio, is_active, is_superuser";

fn ignore_no_rows<T>(err: rusqlite::Error) -> Result<Option<T>, rusqlite::Error> {
    match err {
        rusqlite::Error::QueryReturnedNoRows => Ok(None),
        other => Err(other),
    }
}

#[derive(Clone)]
pub struct SqliteUserStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserStore {
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

        conn.pragma_update(None, "foreign_keys", true)?;

        let db_version = conn
            .query_row("PRAGMA user_version;", [], |row| row.get::<usize, i64>(0))
            .context("Failed to read user database version")?
            - BASE_DB_VERSION as i64;

        if db_version < 0 {
            bail!(
                "User database version {} does not carry the base version marker",
                db_version
            );
        }
        let version = db_version as usize;

        if version >= VERSIONED_SCHEMAS.len() {
            bail!("User database version {} is too new", version);
        }
        VERSIONED_SCHEMAS
            .get(version)
            .context("Failed to get user schema")?
            .validate(&conn)?;

        Self::migrate_if_needed(&conn, version)?;

        Ok(SqliteUserStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn migrate_if_needed(conn: &Connection, version: usize) -> Result<()> {
        let mut latest_from = version;
        for schema in VERSIONED_SCHEMAS.iter().skip(version + 1) {
            if let Some(migration_fn) = schema.migration {
                info!(
                    "Migrating user db from version {} to {}",
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
}

impl UserStore for SqliteUserStore {
    fn create_user(&self, username: &str, email: &str, role: UserRole) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO user (username, email, role, is_active) VALUES (?1, ?2, ?3, 1)",
            params![username, email, role.as_str()],
        )
        .with_context(|| format!("Failed to create user {}", username))?;
        Ok(conn.last_insert_rowid())
    }

    fn upsert_pending_user(
        &self,
        username: &str,
        email: &str,
        code_digest: &str,
    ) -> Result<PendingSignupOutcome> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let existing = tx
            .query_row(
                "SELECT id, email, is_active FROM user WHERE username = ?1",
                params![username],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i32>(2)?,
                    ))
                },
            )
            .map(Some)
            .or_else(ignore_no_rows)?;

        let outcome = match existing {
            Some((user_id, stored_email, is_active)) => {
                if stored_email == email && is_active == 0 {
                    tx.execute(
                        "UPDATE user SET confirmation_code_digest = ?1 WHERE id = ?2",
                        params![code_digest, user_id],
                    )?;
                    PendingSignupOutcome::Reissued { user_id }
                } else {
                    PendingSignupOutcome::Taken
                }
            }
            None => {
                let email_claimed = tx
                    .query_row(
                        "SELECT id FROM user WHERE email = ?1",
                        params![email],
                        |row| row.get::<_, i64>(0),
                    )
                    .map(Some)
                    .or_else(ignore_no_rows)?
                    .is_some();

                if email_claimed {
                    PendingSignupOutcome::Taken
                } else {
                    tx.execute(
                        "INSERT INTO user (username, email, is_active, confirmation_code_digest)
                         VALUES (?1, ?2, 0, ?3)",
                        params![username, email, code_digest],
                    )?;
                    PendingSignupOutcome::Created {
                        user_id: tx.last_insert_rowid(),
                    }
                }
            }
        };

        tx.commit()?;
        Ok(outcome)
    }

    fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let user = conn
            .query_row(
                &format!("SELECT {} FROM user WHERE id = ?1", USER_COLUMNS),
                params![user_id],
                user_from_row,
            )
            .map(Some)
            .or_else(ignore_no_rows)?;
        Ok(user)
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let user = conn
            .query_row(
                &format!("SELECT {} FROM user WHERE username = ?1", USER_COLUMNS),
                params![username],
                user_from_row,
            )
            .map(Some)
            .or_else(ignore_no_rows)?;
        Ok(user)
    }

    fn list_users(&self, search: Option<&str>) -> Result<Vec<User>> {
        let conn = self.conn.lock().unwrap();
        let mut sql = format!("SELECT {} FROM user", USER_COLUMNS);
        let mut values: Vec<Value> = vec![];
        if let Some(search) = search {
            sql.push_str(" WHERE username LIKE ?1");
            values.push(Value::Text(format!("%{}%", search)));
        }
        sql.push_str(" ORDER BY username");
        let mut stmt = conn.prepare(&sql)?;
        let users = stmt
            .query_map(rusqlite::params_from_iter(values), user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    fn get_usernames_by_ids(&self, ids: &[i64]) -> Result<HashMap<i64, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let conn = self.conn.lock().unwrap();
        let placeholders = (1..=ids.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let mut stmt = conn.prepare(&format!(
            "SELECT id, username FROM user WHERE id IN ({})",
            placeholders
        ))?;
        let map = stmt
            .query_map(
                rusqlite::params_from_iter(ids.iter().map(|id| Value::Integer(*id))),
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )?
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(map)
    }

    fn get_confirmation_code_digest(&self, user_id: i64) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let digest = conn
            .query_row(
                "SELECT confirmation_code_digest FROM user WHERE id = ?1",
                params![user_id],
                |row| row.get::<_, Option<String>>(0),
            )
            .or_else(ignore_no_rows)?;
        Ok(digest)
    }

    fn set_confirmation_code_digest(&self, user_id: i64, digest: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE user SET confirmation_code_digest = ?1 WHERE id = ?2",
            params![digest, user_id],
        )?;
        Ok(())
    }

    fn activate_user(&self, user_id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE user SET is_active = 1, confirmation_code_digest = NULL WHERE id = ?1",
            params![user_id],
        )?;
        Ok(())
    }

    fn update_user(&self, user_id: i64, patch: &UserPatch) -> Result<UserUpdateOutcome> {
        {
            let mut conn = self.conn.lock().unwrap();
            let tx = conn.transaction()?;

            let exists = tx
                .query_row(
                    "SELECT id FROM user WHERE id = ?1",
                    params![user_id],
                    |row| row.get::<_, i64>(0),
                )
                .map(Some)
                .or_else(ignore_no_rows)?
                .is_some();
            if !exists {
                return Ok(UserUpdateOutcome::NotFound);
            }

            if let Some(username) = &patch.username {
                let taken = tx
                    .query_row(
                        "SELECT id FROM user WHERE username = ?1 AND id <> ?2",
                        params![username, user_id],
                        |row| row.get::<_, i64>(0),
                    )
                    .map(Some)
                    .or_else(ignore_no_rows)?
                    .is_some();
                if taken {
                    return Ok(UserUpdateOutcome::UsernameTaken);
                }
                tx.execute(
                    "UPDATE user SET username = ?1 WHERE id = ?2",
                    params![username, user_id],
                )?;
            }

            if let Some(email) = &patch.email {
                let taken = tx
                    .query_row(
                        "SELECT id FROM user WHERE email = ?1 AND id <> ?2",
                        params![email, user_id],
                        |row| row.get::<_, i64>(0),
                    )
                    .map(Some)
                    .or_else(ignore_no_rows)?
                    .is_some();
                if taken {
                    return Ok(UserUpdateOutcome::EmailTaken);
                }
                tx.execute(
                    "UPDATE user SET email = ?1 WHERE id = ?2",
                    params![email, user_id],
                )?;
            }

            if let Some(first_name) = &patch.first_name {
                tx.execute(
                    "UPDATE user SET first_name = ?1 WHERE id = ?2",
                    params![first_name, user_id],
                )?;
            }
            if let Some(last_name) = &patch.last_name {
                tx.execute(
                    "UPDATE user SET last_name = ?1 WHERE id = ?2",
                    params![last_name, user_id],
                )?;
            }
            if let Some(bio) = &patch.bio {
                tx.execute(
                    "UPDATE user SET bio = ?1 WHERE id = ?2",
                    params![bio, user_id],
                )?;
            }
            if let Some(role) = patch.role {
                tx.execute(
                    "UPDATE user SET role = ?1 WHERE id = ?2",
                    params![role.as_str(), user_id],
                )?;
            }

            tx.commit()?;
        }

        match self.get_user(user_id)? {
            Some(user) => Ok(UserUpdateOutcome::Updated(user)),
            None => Ok(UserUpdateOutcome::NotFound),
        }
    }

    fn delete_user(&self, username: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM user WHERE username = ?1", params![username])?;
        Ok(deleted > 0)
    }

    fn get_users_count(&self) -> usize {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM user", [], |row| row.get::<_, i64>(0))
            .unwrap_or(0) as usize
    }
}

impl UserAuthTokenStore for SqliteUserStore {
    fn get_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let conn = self.conn.lock().unwrap();
        let record = conn
            .query_row(
                "SELECT user_id, value, created, last_used FROM auth_token WHERE value = ?1",
                params![token.0],
                |row| {
                    Ok(AuthToken {
                        user_id: row.get(0)?,
                        value: AuthTokenValue(row.get(1)?),
                        created: from_unix(row.get(2)?),
                        last_used: row.get::<_, Option<i64>>(3)?.map(from_unix),
                    })
                },
            )
            .map(Some)
            .or_else(ignore_no_rows)?;
        Ok(record)
    }

    fn delete_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let record = self.get_user_auth_token(token)?;
        if record.is_some() {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "DELETE FROM auth_token WHERE value = ?1",
                params![token.0],
            )?;
        }
        Ok(record)
    }

    fn update_user_auth_token_last_used_timestamp(&self, token: &AuthTokenValue) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE auth_token SET last_used = ?1 WHERE value = ?2",
            params![to_unix(SystemTime::now()), token.0],
        )?;
        Ok(())
    }

    fn add_user_auth_token(&self, token: AuthToken) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO auth_token (user_id, value, created, last_used) VALUES (?1, ?2, ?3, ?4)",
            params![
                token.user_id,
                token.value.0,
                to_unix(token.created),
                token.last_used.map(to_unix)
            ],
        )?;
        Ok(())
    }

    fn prune_unused_auth_tokens(&self, unused_for_days: u64) -> Result<usize> {
        let cutoff = to_unix(SystemTime::now()) - (unused_for_days as i64) * 24 * 60 * 60;
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM auth_token WHERE COALESCE(last_used, created) < ?1",
            params![cutoff],
        )?;
        Ok(deleted)
    }
}
