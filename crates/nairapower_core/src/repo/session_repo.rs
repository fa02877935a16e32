//! Session repository: remembers which user is signed in on this device.
//!
//! # Invariants
//! - At most one session row exists (`slot = 1`).
//! - Only the user id is stored; callers resolve the user through
//!   `UserRepository` so the session never holds a stale snapshot.

use crate::model::user::UserId;
use crate::repo::{ensure_connection_ready, RepoResult};
use rusqlite::{Connection, OptionalExtension};

/// Repository interface for the single-slot session.
pub trait SessionRepository {
    /// Stores `user_id` as the signed-in user, replacing any previous one.
    fn save_session(&self, user_id: &str) -> RepoResult<()>;
    /// Returns the signed-in user id, if any.
    fn load_session(&self) -> RepoResult<Option<UserId>>;
    /// Removes the session. Clearing an empty session is a no-op.
    fn clear_session(&self) -> RepoResult<()>;
}

/// SQLite-backed session repository.
#[derive(Clone, Copy)]
pub struct SqliteSessionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSessionRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["session", "users"])?;
        Ok(Self { conn })
    }
}

impl SessionRepository for SqliteSessionRepository<'_> {
    fn save_session(&self, user_id: &str) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO session (slot, user_id, saved_at)
             VALUES (1, ?1, (strftime('%s', 'now') * 1000))
             ON CONFLICT(slot) DO UPDATE SET
                user_id = excluded.user_id,
                saved_at = excluded.saved_at;",
            [user_id],
        )?;
        Ok(())
    }

    fn load_session(&self) -> RepoResult<Option<UserId>> {
        let user_id = self
            .conn
            .query_row("SELECT user_id FROM session WHERE slot = 1;", [], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(user_id)
    }

    fn clear_session(&self) -> RepoResult<()> {
        self.conn.execute("DELETE FROM session;", [])?;
        Ok(())
    }
}
