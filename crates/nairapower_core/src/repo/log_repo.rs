//! Utility log repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Append, list and delete recharge logs scoped to a family.
//!
//! # Invariants
//! - Family listings are newest first: `created_at DESC`, ties broken by
//!   most recent insertion.
//! - Deletes are scoped to `(id, family_id)`; logs of other families are
//!   never touched.

use crate::model::utility_log::{LogId, UtilityLog};
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const LOG_DATE_FORMAT: &str = "%Y-%m-%d";

const LOG_SELECT_SQL: &str = "SELECT
    id,
    family_id,
    user_id,
    user_name,
    log_date,
    units,
    amount,
    previous_reading,
    created_at
FROM utility_logs";

/// Repository interface for utility logs.
pub trait LogRepository {
    /// Inserts one log.
    fn insert_log(&self, log: &UtilityLog) -> RepoResult<()>;
    /// Inserts several logs in one transaction.
    fn insert_logs(&self, logs: &[UtilityLog]) -> RepoResult<()>;
    /// Lists one family's logs, newest first.
    fn list_logs(&self, family_id: &str) -> RepoResult<Vec<UtilityLog>>;
    /// Deletes one log of one family. Returns whether a row was removed.
    fn delete_log(&self, id: LogId, family_id: &str) -> RepoResult<bool>;
}

/// SQLite-backed utility log repository.
#[derive(Clone, Copy)]
pub struct SqliteLogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLogRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["utility_logs"])?;
        Ok(Self { conn })
    }
}

impl LogRepository for SqliteLogRepository<'_> {
    fn insert_log(&self, log: &UtilityLog) -> RepoResult<()> {
        insert_log_row(self.conn, log)
    }

    fn insert_logs(&self, logs: &[UtilityLog]) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for log in logs {
            insert_log_row(&tx, log)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn list_logs(&self, family_id: &str) -> RepoResult<Vec<UtilityLog>> {
        let mut stmt = self.conn.prepare(&format!(
            "{LOG_SELECT_SQL}
             WHERE family_id = ?1
             ORDER BY created_at DESC, rowid DESC;"
        ))?;
        let mut rows = stmt.query([family_id])?;
        let mut logs = Vec::new();
        while let Some(row) = rows.next()? {
            logs.push(parse_log_row(row)?);
        }
        Ok(logs)
    }

    fn delete_log(&self, id: LogId, family_id: &str) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM utility_logs WHERE id = ?1 AND family_id = ?2;",
            params![id.to_string(), family_id],
        )?;
        Ok(changed > 0)
    }
}

/// Validates and inserts one log row. Shared with transactional writers.
pub(crate) fn insert_log_row(conn: &Connection, log: &UtilityLog) -> RepoResult<()> {
    log.validate()?;

    conn.execute(
        "INSERT INTO utility_logs (
            id,
            family_id,
            user_id,
            user_name,
            log_date,
            units,
            amount,
            previous_reading,
            created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
        params![
            log.id.to_string(),
            log.family_id.as_str(),
            log.user_id.as_str(),
            log.user_name.as_str(),
            log.date.format(LOG_DATE_FORMAT).to_string(),
            log.units,
            log.amount,
            log.previous_reading,
            log.created_at,
        ],
    )?;

    Ok(())
}

fn parse_log_row(row: &Row<'_>) -> RepoResult<UtilityLog> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{id_text}` in utility_logs.id"))
    })?;

    let date_text: String = row.get("log_date")?;
    let date = NaiveDate::parse_from_str(&date_text, LOG_DATE_FORMAT).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid date value `{date_text}` in utility_logs.log_date"
        ))
    })?;

    let log = UtilityLog {
        id,
        family_id: row.get("family_id")?,
        user_id: row.get("user_id")?,
        user_name: row.get("user_name")?,
        date,
        units: row.get("units")?,
        amount: row.get("amount")?,
        previous_reading: row.get("previous_reading")?,
        created_at: row.get("created_at")?,
    };
    log.validate()
        .map_err(|err| RepoError::InvalidData(format!("utility log `{id}` is invalid: {err}")))?;
    Ok(log)
}
