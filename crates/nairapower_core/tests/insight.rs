use chrono::{Duration, NaiveDate};
use nairapower_core::service::identity_service::demo_seed_logs;
use nairapower_core::service::insight_service::RECENT_LOG_LIMIT;
use nairapower_core::{
    CoreConfig, InsightError, InsightProvider, InsightRequest, InsightService, UsageInsight,
    UtilityLog,
};
use secrecy::{ExposeSecret, SecretString};
use std::cell::RefCell;
use uuid::Uuid;

/// Replies with a canned result and records what it was asked.
struct ScriptedProvider {
    reply: Result<String, String>,
    seen: RefCell<Vec<(String, InsightRequest)>>,
}

impl ScriptedProvider {
    fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            seen: RefCell::new(Vec::new()),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            seen: RefCell::new(Vec::new()),
        }
    }
}

impl InsightProvider for &ScriptedProvider {
    fn generate(
        &self,
        api_key: &SecretString,
        request: &InsightRequest,
    ) -> Result<String, InsightError> {
        self.seen
            .borrow_mut()
            .push((api_key.expose_secret().to_string(), request.clone()));
        self.reply.clone().map_err(InsightError::Provider)
    }
}

const VALID_REPLY: &str = r#"{
  "summary": "Spending dropped 20% in October.",
  "tips": ["Unplug the freezer at night", "Use LED bulbs", "Iron in batches"]
}"#;

fn key() -> Option<SecretString> {
    Some(SecretString::from("test-key"))
}

fn daily_logs(count: usize) -> Vec<UtilityLog> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    (0..count)
        .map(|day| UtilityLog {
            id: Uuid::new_v4(),
            family_id: "family-1".to_string(),
            user_id: "a@home.ng".to_string(),
            user_name: "A".to_string(),
            date: start + Duration::days(day as i64),
            units: 10.0,
            amount: 1000.0,
            previous_reading: 100.0,
            created_at: day as i64,
        })
        .rev()
        .collect()
}

#[test]
fn valid_reply_passes_through() {
    let provider = ScriptedProvider::replying(VALID_REPLY);
    let service = InsightService::new(&provider, key());

    let insight = service.analyze_usage(&demo_seed_logs());

    assert_eq!(insight.summary, "Spending dropped 20% in October.");
    assert_eq!(insight.tips.len(), 3);
    let seen = provider.seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "test-key");
    assert_eq!(seen[0].1.logs.len(), 2);
}

#[test]
fn fenced_reply_is_accepted() {
    let fenced = format!("```json\n{VALID_REPLY}\n```");
    let provider = ScriptedProvider::replying(&fenced);
    let service = InsightService::new(&provider, key());

    assert_eq!(
        service.analyze_usage(&demo_seed_logs()).tips[1],
        "Use LED bulbs"
    );
}

#[test]
fn missing_credential_skips_provider() {
    let provider = ScriptedProvider::replying(VALID_REPLY);
    let service = InsightService::new(&provider, None);

    assert_eq!(service.analyze_usage(&demo_seed_logs()), UsageInsight::fallback());
    assert!(provider.seen.borrow().is_empty());
}

#[test]
fn blank_config_key_counts_as_missing() {
    let config = CoreConfig::from_lookup(|name| {
        (name == "GEMINI_API_KEY").then(|| "   ".to_string())
    })
    .unwrap();
    let provider = ScriptedProvider::replying(VALID_REPLY);
    let service = InsightService::from_config(&provider, &config);

    assert_eq!(service.analyze_usage(&demo_seed_logs()), UsageInsight::fallback());
}

#[test]
fn provider_failure_yields_fallback() {
    let provider = ScriptedProvider::failing("quota exceeded");
    let service = InsightService::new(&provider, key());

    let insight = service.analyze_usage(&demo_seed_logs());

    assert_eq!(insight, UsageInsight::fallback());
    assert_eq!(
        insight.summary,
        "Could not generate analysis at this time. Please ensure your API Key is valid."
    );
    assert_eq!(
        insight.tips,
        vec![
            "Check insulation",
            "Turn off unused lights",
            "Service AC units regularly"
        ]
    );
}

#[test]
fn malformed_replies_yield_fallback() {
    let two_tips = r#"{"summary": "ok", "tips": ["one", "two"]}"#;
    for reply in [two_tips, "not json at all", "", r#"{"summary": " ", "tips": ["a", "b", "c"]}"#] {
        let provider = ScriptedProvider::replying(reply);
        let service = InsightService::new(&provider, key());
        assert_eq!(
            service.analyze_usage(&demo_seed_logs()),
            UsageInsight::fallback(),
            "reply {reply:?} should fall back"
        );
    }
}

#[test]
fn provider_receives_latest_logs_oldest_first() {
    let provider = ScriptedProvider::replying(VALID_REPLY);
    let service = InsightService::new(&provider, key());
    let logs = daily_logs(15);

    service.analyze_usage(&logs);

    let seen = provider.seen.borrow();
    let sent = &seen[0].1.logs;
    assert_eq!(sent.len(), RECENT_LOG_LIMIT);
    assert_eq!(sent[0].date, NaiveDate::from_ymd_opt(2024, 1, 6).unwrap());
    assert_eq!(sent[9].date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
}

#[test]
fn request_json_uses_record_field_names() {
    let request = InsightRequest::from_logs(&demo_seed_logs());

    let json = request.to_json().unwrap();

    assert!(json.contains("\"previousReading\": 12400.0"));
    assert!(json.contains("\"userName\": \"Mom\""));
    assert!(json.contains("\"date\": \"2023-10-15\""));
}
