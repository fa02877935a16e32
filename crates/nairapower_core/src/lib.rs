//! Core domain logic for NairaPower, a household electricity-spend tracker.
//! This crate is the single source of truth for family membership, session
//! and log invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::family::{Family, FamilyId};
pub use model::user::{User, UserId};
pub use model::utility_log::{LogId, UtilityLog};
pub use model::validation::ModelValidationError;
pub use repo::family_repo::{FamilyRepository, SqliteFamilyRepository};
pub use repo::log_repo::{LogRepository, SqliteLogRepository};
pub use repo::session_repo::{SessionRepository, SqliteSessionRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use service::family_service::{FamilyService, FamilyServiceError};
pub use service::identity_service::{IdentityError, IdentityService};
pub use service::insight_service::{
    InsightError, InsightProvider, InsightRequest, InsightService, UsageInsight,
};
pub use service::log_service::{
    usage_stats, LogService, LogServiceError, NewLogRequest, UsageStats,
};
pub use service::onboarding_service::{OnboardingError, OnboardingOutcome, OnboardingService};
pub use service::session_service::{SessionError, SessionService};
