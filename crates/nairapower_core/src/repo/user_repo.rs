//! User repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist and resolve users by id or email.
//! - Keep the `users` table shape inside the persistence boundary.
//!
//! # Invariants
//! - Email lookups are case-insensitive.
//! - `family_id` is never written here; membership changes go through
//!   `FamilyRepository` so the member list and the user stay in sync.

use crate::model::user::{normalize_email, User, UserId};
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const USER_SELECT_SQL: &str = "SELECT
    id,
    name,
    email,
    avatar,
    family_id
FROM users";

/// Repository interface for user records.
pub trait UserRepository {
    /// Inserts a new user. Fails when the id is already taken.
    fn create_user(&self, user: &User) -> RepoResult<()>;
    /// Loads one user by id.
    fn get_user(&self, id: &str) -> RepoResult<Option<User>>;
    /// Loads one user by email, ignoring case and surrounding whitespace.
    fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    /// Loads users in the order of `ids`, skipping unknown ids.
    fn get_users(&self, ids: &[UserId]) -> RepoResult<Vec<User>>;
    /// Replaces the display name of an existing user.
    fn rename_user(&self, id: &str, name: &str) -> RepoResult<()>;
}

/// SQLite-backed user repository.
#[derive(Clone, Copy)]
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["users"])?;
        Ok(Self { conn })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &User) -> RepoResult<()> {
        insert_user_row(self.conn, user)
    }

    fn get_user(&self, id: &str) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }

        Ok(None)
    }

    fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let normalized = normalize_email(email);
        let mut stmt = self.conn.prepare(&format!(
            "{USER_SELECT_SQL} WHERE email = ?1 COLLATE NOCASE;"
        ))?;
        let mut rows = stmt.query([normalized.as_str()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }

        Ok(None)
    }

    fn get_users(&self, ids: &[UserId]) -> RepoResult<Vec<User>> {
        let mut users = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(user) = self.get_user(id)? {
                users.push(user);
            }
        }
        Ok(users)
    }

    fn rename_user(&self, id: &str, name: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE users
             SET
                name = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id, name],
        )?;

        if changed == 0 {
            return Err(RepoError::not_found("user", id));
        }

        Ok(())
    }
}

/// Validates and inserts one user row. Shared with transactional writers.
pub(crate) fn insert_user_row(conn: &Connection, user: &User) -> RepoResult<()> {
    user.validate()?;

    conn.execute(
        "INSERT INTO users (id, name, email, avatar, family_id)
         VALUES (?1, ?2, ?3, ?4, ?5);",
        params![
            user.id.as_str(),
            user.name.as_str(),
            user.email.as_str(),
            user.avatar.as_str(),
            user.family_id.as_deref(),
        ],
    )?;

    Ok(())
}

/// Returns whether a user row exists.
pub(crate) fn user_exists(conn: &Connection, id: &str) -> RepoResult<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM users WHERE id = ?1;", [id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let user = User {
        id: row.get("id")?,
        name: row.get("name")?,
        email: row.get("email")?,
        avatar: row.get("avatar")?,
        family_id: row.get("family_id")?,
    };
    user.validate().map_err(|err| {
        RepoError::InvalidData(format!("user row `{}` is invalid: {err}", user.id))
    })?;
    Ok(user)
}
