//! Core configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `NAIRAPOWER_DB_PATH` - SQLite file path (default: in-memory store)
//! - `NAIRAPOWER_LOG_LEVEL` - `trace|debug|info|warn|error` (default: build mode)
//! - `NAIRAPOWER_LOG_DIR` - absolute directory for rolling logs (default: logging off)
//! - `GEMINI_API_KEY` - credential for the insight provider

use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::logging::{default_log_level, init_logging, normalize_level};
use rusqlite::Connection;
use secrecy::SecretString;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DB_PATH_VAR: &str = "NAIRAPOWER_DB_PATH";
pub const LOG_LEVEL_VAR: &str = "NAIRAPOWER_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "NAIRAPOWER_LOG_DIR";
pub const INSIGHT_API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Configuration errors that can occur during loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidEnvVar { name: &'static str, reason: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidEnvVar { name, reason } => {
                write!(f, "invalid environment variable {name}: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

/// Runtime settings for the record store, logging and insights.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct CoreConfig {
    /// `None` keeps all records in memory.
    pub db_path: Option<PathBuf>,
    /// Normalized log level.
    pub log_level: &'static str,
    /// `None` leaves file logging disabled.
    pub log_dir: Option<PathBuf>,
    pub insight_api_key: Option<SecretString>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("db_path", &self.db_path)
            .field("log_level", &self.log_level)
            .field("log_dir", &self.log_dir)
            .field(
                "insight_api_key",
                &self.insight_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl CoreConfig {
    /// Loads `.env` (if present) and then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds configuration from an arbitrary variable lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let log_level = match read(LOG_LEVEL_VAR) {
            Some(value) => normalize_level(&value).map_err(|reason| ConfigError::InvalidEnvVar {
                name: LOG_LEVEL_VAR,
                reason,
            })?,
            None => default_log_level(),
        };

        let log_dir = read(LOG_DIR_VAR).map(PathBuf::from);
        if let Some(dir) = &log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::InvalidEnvVar {
                    name: LOG_DIR_VAR,
                    reason: format!("must be an absolute path, got `{}`", dir.display()),
                });
            }
        }

        Ok(Self {
            db_path: read(DB_PATH_VAR).map(PathBuf::from),
            log_level,
            log_dir,
            insight_api_key: read(INSIGHT_API_KEY_VAR).map(SecretString::from),
        })
    }

    /// Opens the configured record store with migrations applied.
    pub fn open_database(&self) -> DbResult<Connection> {
        match &self.db_path {
            Some(path) => open_db(path),
            None => open_db_in_memory(),
        }
    }

    /// Starts file logging when a log directory is configured.
    pub fn init_logging(&self) -> Result<(), String> {
        match &self.log_dir {
            Some(dir) => init_logging(self.log_level, dir),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig, LOG_DIR_VAR, LOG_LEVEL_VAR};
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<CoreConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        CoreConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = config_from(&[]).unwrap();
        assert!(config.db_path.is_none());
        assert!(config.log_dir.is_none());
        assert!(config.insight_api_key.is_none());
        assert_eq!(config.log_level, super::default_log_level());
    }

    #[test]
    fn reads_values_and_treats_blank_as_unset() {
        let config = config_from(&[
            ("NAIRAPOWER_DB_PATH", "/tmp/nairapower.sqlite3"),
            ("NAIRAPOWER_LOG_LEVEL", "WARNING"),
            ("GEMINI_API_KEY", "  "),
        ])
        .unwrap();
        assert_eq!(
            config.db_path.as_deref(),
            Some(std::path::Path::new("/tmp/nairapower.sqlite3"))
        );
        assert_eq!(config.log_level, "warn");
        assert!(config.insight_api_key.is_none());
    }

    #[test]
    fn api_key_is_kept_secret_in_debug_output() {
        let config = config_from(&[("GEMINI_API_KEY", "sk-live-123")]).unwrap();
        let key = config.insight_api_key.as_ref().unwrap();
        assert_eq!(key.expose_secret(), "sk-live-123");
        assert!(!format!("{config:?}").contains("sk-live-123"));
    }

    #[test]
    fn rejects_bad_level_and_relative_log_dir() {
        let level = config_from(&[(LOG_LEVEL_VAR, "loud")]).unwrap_err();
        assert!(matches!(level, ConfigError::InvalidEnvVar { name, .. } if name == LOG_LEVEL_VAR));

        let dir = config_from(&[(LOG_DIR_VAR, "logs")]).unwrap_err();
        assert!(matches!(dir, ConfigError::InvalidEnvVar { name, .. } if name == LOG_DIR_VAR));
    }

    #[test]
    fn default_config_opens_in_memory_store() {
        let config = config_from(&[]).unwrap();
        let conn = config.open_database().unwrap();
        let version: u32 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, crate::db::migrations::latest_version());
    }
}
