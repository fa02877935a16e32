//! Utility log domain model.
//!
//! # Responsibility
//! - Define one recorded electricity recharge event.
//!
//! # Invariants
//! - `units`, `amount` and `previous_reading` are finite and non-negative.
//! - Logs are never edited after creation.

use crate::model::family::FamilyId;
use crate::model::user::UserId;
use crate::model::validation::{require_quantity, require_text, ModelValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a utility log.
pub type LogId = Uuid;

/// Recharge event belonging to one family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilityLog {
    pub id: LogId,
    pub family_id: FamilyId,
    /// Who recorded the entry. Not required to be a registered user.
    pub user_id: UserId,
    /// Display name captured at recording time.
    pub user_name: String,
    /// Calendar date of the recharge.
    pub date: NaiveDate,
    /// Energy purchased, kWh.
    pub units: f64,
    /// Amount paid, Naira.
    pub amount: f64,
    /// Meter reading before the recharge.
    pub previous_reading: f64,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl UtilityLog {
    /// Checks field-level invariants before persistence.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("utility_log", "family_id", &self.family_id)?;
        require_text("utility_log", "user_id", &self.user_id)?;
        require_text("utility_log", "user_name", &self.user_name)?;
        require_quantity("units", self.units)?;
        require_quantity("amount", self.amount)?;
        require_quantity("previous_reading", self.previous_reading)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::UtilityLog;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn sample() -> UtilityLog {
        UtilityLog {
            id: Uuid::new_v4(),
            family_id: "fam".to_string(),
            user_id: "dad@home.ng".to_string(),
            user_name: "Dad".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            units: 80.5,
            amount: 9000.0,
            previous_reading: 1200.0,
            created_at: 1,
        }
    }

    #[test]
    fn validate_accepts_zero_quantities() {
        let mut log = sample();
        log.units = 0.0;
        log.amount = 0.0;
        assert!(log.validate().is_ok());
    }

    #[test]
    fn validate_rejects_negative_and_non_finite_values() {
        let mut log = sample();
        log.amount = -1.0;
        assert!(log.validate().is_err());

        let mut log = sample();
        log.units = f64::NAN;
        assert!(log.validate().is_err());
    }

    #[test]
    fn serializes_with_camel_case_and_iso_date() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["date"], "2024-01-05");
        assert_eq!(json["previousReading"], 1200.0);
        assert_eq!(json["userName"], "Dad");
    }
}
