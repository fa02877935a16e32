//! Utility log use-case service.
//!
//! # Responsibility
//! - Record, list and delete a family's recharge logs.
//! - Summarize spending over a set of logs.
//!
//! # Invariants
//! - Every mutating call returns the recomputed family view, newest first.
//! - Logs can only be added to existing families.

use crate::model::family::FamilyId;
use crate::model::user::{User, UserId};
use crate::model::utility_log::{LogId, UtilityLog};
use crate::repo::family_repo::FamilyRepository;
use crate::repo::log_repo::LogRepository;
use crate::repo::RepoError;
use chrono::{NaiveDate, Utc};
use log::info;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Errors from log service operations.
#[derive(Debug)]
pub enum LogServiceError {
    /// Target family does not exist.
    FamilyNotFound(FamilyId),
    /// Recording user has not created or joined a family yet.
    UserHasNoFamily(UserId),
    /// Persistence-layer failure, including validation.
    Repo(RepoError),
}

impl Display for LogServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FamilyNotFound(id) => write!(f, "family not found: {id}"),
            Self::UserHasNoFamily(id) => write!(f, "user {id} does not belong to a family"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LogServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for LogServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Input for recording a new recharge.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLogRequest {
    pub date: NaiveDate,
    /// kWh purchased.
    pub units: f64,
    /// Amount paid.
    pub amount: f64,
    pub previous_reading: f64,
}

/// Aggregate spending over a set of logs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub total_spent: f64,
    pub total_units: f64,
    /// Mean amount per recharge; `0.0` when there are no logs.
    pub average_recharge: f64,
    pub entry_count: usize,
}

/// Log service facade over repository implementations.
pub struct LogService<L: LogRepository, F: FamilyRepository> {
    logs: L,
    families: F,
}

impl<L: LogRepository, F: FamilyRepository> LogService<L, F> {
    /// Creates a service using the provided repository implementations.
    pub fn new(logs: L, families: F) -> Self {
        Self { logs, families }
    }

    /// Lists a family's logs, newest first.
    pub fn get_logs(&self, family_id: &str) -> Result<Vec<UtilityLog>, LogServiceError> {
        Ok(self.logs.list_logs(family_id)?)
    }

    /// Stores a fully built log and returns its family's updated view.
    pub fn add_log(&self, log: &UtilityLog) -> Result<Vec<UtilityLog>, LogServiceError> {
        if self.families.get_family(&log.family_id)?.is_none() {
            return Err(LogServiceError::FamilyNotFound(log.family_id.clone()));
        }

        self.logs.insert_log(log)?;
        info!(
            "event=log_add module=log status=ok family_id={} log_id={}",
            log.family_id, log.id
        );
        Ok(self.logs.list_logs(&log.family_id)?)
    }

    /// Records a recharge by `user` into the user's current family.
    pub fn record_log(
        &self,
        user: &User,
        request: &NewLogRequest,
    ) -> Result<Vec<UtilityLog>, LogServiceError> {
        let family_id = user
            .family_id
            .clone()
            .ok_or_else(|| LogServiceError::UserHasNoFamily(user.id.clone()))?;

        let log = UtilityLog {
            id: Uuid::new_v4(),
            family_id,
            user_id: user.id.clone(),
            user_name: user.name.clone(),
            date: request.date,
            units: request.units,
            amount: request.amount,
            previous_reading: request.previous_reading,
            created_at: Utc::now().timestamp_millis(),
        };
        self.add_log(&log)
    }

    /// Deletes one of the family's logs and returns the updated view.
    ///
    /// Unknown ids, and ids belonging to another family, leave storage
    /// unchanged.
    pub fn delete_log(
        &self,
        id: LogId,
        family_id: &str,
    ) -> Result<Vec<UtilityLog>, LogServiceError> {
        let removed = self.logs.delete_log(id, family_id)?;
        info!(
            "event=log_delete module=log status=ok family_id={} log_id={} removed={}",
            family_id, id, removed
        );
        Ok(self.logs.list_logs(family_id)?)
    }
}

/// Computes totals and the average recharge amount.
pub fn usage_stats(logs: &[UtilityLog]) -> UsageStats {
    let total_spent: f64 = logs.iter().map(|log| log.amount).sum();
    let total_units: f64 = logs.iter().map(|log| log.units).sum();
    let average_recharge = if logs.is_empty() {
        0.0
    } else {
        total_spent / logs.len() as f64
    };

    UsageStats {
        total_spent,
        total_units,
        average_recharge,
        entry_count: logs.len(),
    }
}
