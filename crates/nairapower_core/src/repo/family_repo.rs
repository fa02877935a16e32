//! Family repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist families together with their ordered member list.
//! - Keep `users.family_id` consistent with membership writes.
//!
//! # Invariants
//! - Invite codes are unique across families (checked in-transaction and
//!   backed by a unique index).
//! - Creating a family and adding a member are atomic: the family row,
//!   member rows and `users.family_id` change together or not at all.
//! - Enrolling a first-time user (registration plus family setup, with any
//!   seed logs) is one transaction as well.
//! - Member lists are returned in join order (`position ASC`).

use crate::model::family::{Family, FamilyId};
use crate::model::user::{User, UserId};
use crate::model::utility_log::UtilityLog;
use crate::repo::log_repo::insert_log_row;
use crate::repo::user_repo::{insert_user_row, user_exists};
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const FAMILY_SELECT_SQL: &str = "SELECT
    id,
    name,
    creator_id,
    invite_code,
    created_at
FROM families";

/// Repository interface for family records and membership.
pub trait FamilyRepository {
    /// Inserts a family, its members, and points every member at it.
    fn create_family(&self, family: &Family) -> RepoResult<()>;
    /// Loads one family by id.
    fn get_family(&self, id: &str) -> RepoResult<Option<Family>>;
    /// Loads the family owning an exact (already normalized) invite code.
    fn find_by_invite_code(&self, invite_code: &str) -> RepoResult<Option<Family>>;
    /// Loads the oldest family with an exact name.
    fn find_by_name(&self, name: &str) -> RepoResult<Option<Family>>;
    /// Appends a member if absent and sets the user's family. Idempotent.
    fn add_member(&self, family_id: &str, user_id: &str) -> RepoResult<Family>;
    /// Registers `creator`, creates `family` around them and stores
    /// `seed_logs` in one transaction.
    fn create_family_for_new_user(
        &self,
        creator: &User,
        family: &Family,
        seed_logs: &[UtilityLog],
    ) -> RepoResult<()>;
    /// Registers `user` and appends them to an existing family in one
    /// transaction.
    fn add_new_member(&self, family_id: &str, user: &User) -> RepoResult<Family>;
}

/// SQLite-backed family repository.
#[derive(Clone, Copy)]
pub struct SqliteFamilyRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFamilyRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &["families", "family_members", "users", "utility_logs"],
        )?;
        Ok(Self { conn })
    }
}

impl FamilyRepository for SqliteFamilyRepository<'_> {
    fn create_family(&self, family: &Family) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        insert_family_rows(&tx, family)?;
        tx.commit()?;
        Ok(())
    }

    fn get_family(&self, id: &str) -> RepoResult<Option<Family>> {
        load_family(self.conn, "WHERE id = ?1", id)
    }

    fn find_by_invite_code(&self, invite_code: &str) -> RepoResult<Option<Family>> {
        load_family(self.conn, "WHERE invite_code = ?1", invite_code)
    }

    fn find_by_name(&self, name: &str) -> RepoResult<Option<Family>> {
        load_family(
            self.conn,
            "WHERE name = ?1 ORDER BY created_at ASC, rowid ASC LIMIT 1",
            name,
        )
    }

    fn add_member(&self, family_id: &str, user_id: &str) -> RepoResult<Family> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let family = append_member(&tx, family_id, user_id)?;
        tx.commit()?;
        Ok(family)
    }

    fn create_family_for_new_user(
        &self,
        creator: &User,
        family: &Family,
        seed_logs: &[UtilityLog],
    ) -> RepoResult<()> {
        if family.creator_id != creator.id {
            return Err(RepoError::InvalidData(format!(
                "family `{}` is not owned by the user being registered",
                family.id
            )));
        }
        if let Some(stray) = seed_logs.iter().find(|log| log.family_id != family.id) {
            return Err(RepoError::InvalidData(format!(
                "seed log `{}` targets family `{}`, expected `{}`",
                stray.id, stray.family_id, family.id
            )));
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        insert_user_row(&tx, creator)?;
        insert_family_rows(&tx, family)?;
        for log in seed_logs {
            insert_log_row(&tx, log)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn add_new_member(&self, family_id: &str, user: &User) -> RepoResult<Family> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        insert_user_row(&tx, user)?;
        let family = append_member(&tx, family_id, &user.id)?;
        tx.commit()?;
        Ok(family)
    }
}

fn insert_family_rows(conn: &Connection, family: &Family) -> RepoResult<()> {
    family.validate()?;

    if invite_code_taken(conn, &family.invite_code)? {
        return Err(RepoError::DuplicateInviteCode(family.invite_code.clone()));
    }
    for member in &family.member_ids {
        if !user_exists(conn, member)? {
            return Err(RepoError::not_found("user", member.as_str()));
        }
    }

    conn.execute(
        "INSERT INTO families (id, name, creator_id, invite_code, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5);",
        params![
            family.id.as_str(),
            family.name.as_str(),
            family.creator_id.as_str(),
            family.invite_code.as_str(),
            family.created_at,
        ],
    )?;

    for (position, member) in family.member_ids.iter().enumerate() {
        conn.execute(
            "INSERT INTO family_members (family_id, user_id, position)
             VALUES (?1, ?2, ?3);",
            params![family.id.as_str(), member.as_str(), position as i64],
        )?;
        assign_user_family(conn, member, &family.id)?;
    }

    Ok(())
}

fn append_member(conn: &Connection, family_id: &str, user_id: &str) -> RepoResult<Family> {
    if load_family(conn, "WHERE id = ?1", family_id)?.is_none() {
        return Err(RepoError::not_found("family", family_id));
    }
    if !user_exists(conn, user_id)? {
        return Err(RepoError::not_found("user", user_id));
    }

    conn.execute(
        "INSERT OR IGNORE INTO family_members (family_id, user_id, position)
         VALUES (
            ?1,
            ?2,
            (SELECT COALESCE(MAX(position), -1) + 1
             FROM family_members
             WHERE family_id = ?1)
         );",
        params![family_id, user_id],
    )?;
    assign_user_family(conn, user_id, family_id)?;

    load_family(conn, "WHERE id = ?1", family_id)?
        .ok_or_else(|| RepoError::not_found("family", family_id))
}

fn invite_code_taken(conn: &Connection, invite_code: &str) -> RepoResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM families WHERE invite_code = ?1;",
            [invite_code],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn assign_user_family(conn: &Connection, user_id: &str, family_id: &str) -> RepoResult<()> {
    let changed = conn.execute(
        "UPDATE users
         SET
            family_id = ?2,
            updated_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?1;",
        params![user_id, family_id],
    )?;

    if changed == 0 {
        return Err(RepoError::not_found("user", user_id));
    }

    Ok(())
}

fn load_family(conn: &Connection, filter_sql: &str, value: &str) -> RepoResult<Option<Family>> {
    let mut stmt = conn.prepare(&format!("{FAMILY_SELECT_SQL} {filter_sql};"))?;
    let mut rows = stmt.query([value])?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };

    let mut family = parse_family_row(row)?;
    family.member_ids = load_member_ids(conn, &family.id)?;
    family.validate().map_err(|err| {
        RepoError::InvalidData(format!("family row `{}` is invalid: {err}", family.id))
    })?;
    Ok(Some(family))
}

fn parse_family_row(row: &Row<'_>) -> RepoResult<Family> {
    Ok(Family {
        id: row.get("id")?,
        name: row.get("name")?,
        creator_id: row.get("creator_id")?,
        invite_code: row.get("invite_code")?,
        member_ids: Vec::new(),
        created_at: row.get("created_at")?,
    })
}

fn load_member_ids(conn: &Connection, family_id: &FamilyId) -> RepoResult<Vec<UserId>> {
    let mut stmt = conn.prepare(
        "SELECT user_id
         FROM family_members
         WHERE family_id = ?1
         ORDER BY position ASC, rowid ASC;",
    )?;
    let mut rows = stmt.query([family_id.as_str()])?;
    let mut members = Vec::new();
    while let Some(row) = rows.next()? {
        members.push(row.get(0)?);
    }
    Ok(members)
}
