//! Usage insight service: the boundary to the external AI collaborator.
//!
//! # Responsibility
//! - Select the most recent logs and hand them to an `InsightProvider`.
//! - Validate the provider's structured response.
//! - Degrade every failure to a fixed fallback insight.
//!
//! # Invariants
//! - `analyze_usage` never returns an error; failures are logged and
//!   replaced with `UsageInsight::fallback()`.
//! - A valid insight has a non-blank summary and exactly three tips.

use crate::config::CoreConfig;
use crate::model::utility_log::UtilityLog;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Maximum number of logs sent to the provider.
pub const RECENT_LOG_LIMIT: usize = 10;
/// Number of tips a valid response must carry.
pub const EXPECTED_TIP_COUNT: usize = 3;

pub const FALLBACK_SUMMARY: &str =
    "Could not generate analysis at this time. Please ensure your API Key is valid.";
pub const FALLBACK_TIPS: [&str; EXPECTED_TIP_COUNT] = [
    "Check insulation",
    "Turn off unused lights",
    "Service AC units regularly",
];

static CODE_FENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*```(?:json)?\s*(.*?)\s*```\s*$").expect("valid code fence regex")
});

/// Summary of spending trends plus saving tips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageInsight {
    pub summary: String,
    pub tips: Vec<String>,
}

impl UsageInsight {
    /// Static payload shown when analysis is unavailable.
    pub fn fallback() -> Self {
        Self {
            summary: FALLBACK_SUMMARY.to_string(),
            tips: FALLBACK_TIPS.iter().map(|tip| tip.to_string()).collect(),
        }
    }
}

/// Errors raised while obtaining an insight. Never surfaced to callers of
/// `InsightService::analyze_usage`.
#[derive(Debug)]
pub enum InsightError {
    /// No API credential configured.
    MissingCredential,
    /// Provider call failed (transport, quota, empty reply).
    Provider(String),
    /// Response text is not a valid insight payload.
    MalformedResponse(String),
}

impl InsightError {
    fn code(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::Provider(_) => "provider_failed",
            Self::MalformedResponse(_) => "malformed_response",
        }
    }
}

impl Display for InsightError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingCredential => write!(f, "insight API key is not configured"),
            Self::Provider(message) => write!(f, "insight provider failed: {message}"),
            Self::MalformedResponse(message) => {
                write!(f, "malformed insight response: {message}")
            }
        }
    }
}

impl Error for InsightError {}

/// Data handed to the provider for one analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct InsightRequest {
    /// At most [`RECENT_LOG_LIMIT`] logs, oldest first.
    pub logs: Vec<UtilityLog>,
}

impl InsightRequest {
    /// Builds a request from the most recent logs of `logs`.
    pub fn from_logs(logs: &[UtilityLog]) -> Self {
        Self {
            logs: select_recent_logs(logs),
        }
    }

    /// Structured payload for the provider.
    pub fn to_json(&self) -> Result<String, InsightError> {
        serde_json::to_string_pretty(&self.logs)
            .map_err(|err| InsightError::Provider(format!("could not serialize logs: {err}")))
    }
}

/// Generates raw insight text from usage data. Implemented by AI clients.
pub trait InsightProvider {
    fn generate(&self, api_key: &SecretString, request: &InsightRequest)
        -> Result<String, InsightError>;
}

/// Usage analysis with guaranteed fallback.
pub struct InsightService<P: InsightProvider> {
    provider: P,
    api_key: Option<SecretString>,
}

impl<P: InsightProvider> InsightService<P> {
    /// Creates a service; `api_key = None` always yields the fallback.
    pub fn new(provider: P, api_key: Option<SecretString>) -> Self {
        Self { provider, api_key }
    }

    /// Creates a service using the credential from `config`.
    pub fn from_config(provider: P, config: &CoreConfig) -> Self {
        Self::new(provider, config.insight_api_key.clone())
    }

    /// Analyzes usage trends, returning the fallback on any failure.
    pub fn analyze_usage(&self, logs: &[UtilityLog]) -> UsageInsight {
        match self.try_analyze(logs) {
            Ok(insight) => {
                info!(
                    "event=insight_analyze module=insight status=ok log_count={}",
                    logs.len().min(RECENT_LOG_LIMIT)
                );
                insight
            }
            Err(err) => {
                warn!(
                    "event=insight_analyze module=insight status=fallback error_code={} error={}",
                    err.code(),
                    err
                );
                UsageInsight::fallback()
            }
        }
    }

    fn try_analyze(&self, logs: &[UtilityLog]) -> Result<UsageInsight, InsightError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(InsightError::MissingCredential)?;
        let request = InsightRequest::from_logs(logs);
        let text = self.provider.generate(api_key, &request)?;
        parse_insight_response(&text)
    }
}

/// Sorts by date ascending and keeps the last [`RECENT_LOG_LIMIT`] entries.
pub fn select_recent_logs(logs: &[UtilityLog]) -> Vec<UtilityLog> {
    let mut sorted = logs.to_vec();
    sorted.sort_by_key(|log| log.date);
    let skip = sorted.len().saturating_sub(RECENT_LOG_LIMIT);
    sorted.split_off(skip)
}

/// Parses provider text into an insight. Accepts a bare JSON object or one
/// wrapped in a markdown code fence.
pub fn parse_insight_response(text: &str) -> Result<UsageInsight, InsightError> {
    let body = CODE_FENCE_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map_or(text, |m| m.as_str())
        .trim();
    if body.is_empty() {
        return Err(InsightError::MalformedResponse("empty response".to_string()));
    }

    let insight: UsageInsight = serde_json::from_str(body)
        .map_err(|err| InsightError::MalformedResponse(err.to_string()))?;
    if insight.summary.trim().is_empty() {
        return Err(InsightError::MalformedResponse(
            "summary is blank".to_string(),
        ));
    }
    if insight.tips.len() != EXPECTED_TIP_COUNT {
        return Err(InsightError::MalformedResponse(format!(
            "expected {EXPECTED_TIP_COUNT} tips, got {}",
            insight.tips.len()
        )));
    }

    Ok(insight)
}

#[cfg(test)]
mod tests {
    use super::{parse_insight_response, select_recent_logs, InsightError, RECENT_LOG_LIMIT};
    use crate::model::utility_log::UtilityLog;
    use chrono::{Days, NaiveDate};
    use uuid::Uuid;

    fn log_on(date: NaiveDate) -> UtilityLog {
        UtilityLog {
            id: Uuid::new_v4(),
            family_id: "fam".to_string(),
            user_id: "dad@home.ng".to_string(),
            user_name: "Dad".to_string(),
            date,
            units: 10.0,
            amount: 1000.0,
            previous_reading: 0.0,
            created_at: 0,
        }
    }

    #[test]
    fn select_recent_logs_keeps_latest_dates_in_ascending_order() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let logs: Vec<UtilityLog> = (0..14u64)
            .rev()
            .map(|offset| log_on(start.checked_add_days(Days::new(offset)).unwrap()))
            .collect();

        let recent = select_recent_logs(&logs);

        assert_eq!(recent.len(), RECENT_LOG_LIMIT);
        assert_eq!(recent[0].date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(
            recent[RECENT_LOG_LIMIT - 1].date,
            NaiveDate::from_ymd_opt(2024, 1, 14).unwrap()
        );
    }

    #[test]
    fn parse_accepts_fenced_json() {
        let text = "```json\n{\"summary\":\"Stable\",\"tips\":[\"a\",\"b\",\"c\"]}\n```";
        let insight = parse_insight_response(text).unwrap();
        assert_eq!(insight.summary, "Stable");
        assert_eq!(insight.tips.len(), 3);
    }

    #[test]
    fn parse_rejects_wrong_tip_count_and_garbage() {
        let two_tips = r#"{"summary":"Rising","tips":["a","b"]}"#;
        assert!(matches!(
            parse_insight_response(two_tips),
            Err(InsightError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_insight_response("not json"),
            Err(InsightError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_insight_response("  "),
            Err(InsightError::MalformedResponse(_))
        ));
    }
}
