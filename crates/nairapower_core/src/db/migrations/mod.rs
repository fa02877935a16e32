//! Versioned schema for the household record store.
//!
//! Each step is one SQL file. All pending steps run inside a single
//! transaction and `PRAGMA user_version` ends up at the last applied step,
//! so a store is either fully upgraded or left at its previous version.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: [Migration; 3] = [
    Migration {
        version: 1,
        name: "users_families",
        sql: include_str!("0001_users_families.sql"),
    },
    Migration {
        version: 2,
        name: "utility_logs",
        sql: include_str!("0002_utility_logs.sql"),
    },
    Migration {
        version: 3,
        name: "session",
        sql: include_str!("0003_session.sql"),
    },
];

/// Schema version a fully upgraded store reports.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |step| step.version)
}

/// Reads the schema version recorded in the store. `0` for a blank database.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}

/// Brings the store up to [`latest_version`] and returns how many steps ran.
///
/// # Errors
/// - [`DbError::UnsupportedSchemaVersion`] when the store is newer than this
///   build; nothing is touched in that case.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<usize> {
    let from_version = schema_version(conn)?;
    let latest = latest_version();
    if from_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: latest,
        });
    }

    let pending: Vec<&Migration> = MIGRATIONS
        .iter()
        .filter(|step| step.version > from_version)
        .collect();
    if pending.is_empty() {
        return Ok(0);
    }

    let tx = conn.transaction()?;
    for step in &pending {
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
        info!(
            "event=db_migrate module=db status=applied version={} name={}",
            step.version, step.name
        );
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={} steps={}",
        from_version,
        latest,
        pending.len()
    );
    Ok(pending.len())
}
