//! Onboarding flow: create or join a family as the signed-in user.
//!
//! # Responsibility
//! - Guard family creation/join with a session check.
//! - Map failures to user-facing messages.
//!
//! # Invariants
//! - Nothing is written when the acting user is not the session user.
//! - The returned user is re-resolved after the write, so it already carries
//!   the new `family_id`.

use crate::model::family::Family;
use crate::model::user::User;
use crate::repo::family_repo::FamilyRepository;
use crate::repo::session_repo::SessionRepository;
use crate::repo::user_repo::UserRepository;
use crate::repo::RepoError;
use crate::service::family_service::{FamilyService, FamilyServiceError};
use crate::service::session_service::{SessionError, SessionService};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const SESSION_MISMATCH_MESSAGE: &str =
    "Unable to find your account session. Please sign in again.";
pub const INVALID_INVITE_CODE_MESSAGE: &str =
    "Invalid invite code. Please ask the family admin for the correct code.";
pub const INVALID_FAMILY_NAME_MESSAGE: &str = "Please enter a family name.";
pub const FAMILY_SETUP_FAILED_MESSAGE: &str = "Could not set up your family. Please try again.";

/// Errors from onboarding flows.
#[derive(Debug)]
pub enum OnboardingError {
    /// Acting user differs from the stored session.
    SessionMismatch,
    /// No family owns the supplied invite code.
    InvalidInviteCode,
    /// Family name is blank.
    InvalidFamilyName,
    /// Family write failed.
    Family(FamilyServiceError),
    /// Session or user lookup failed.
    Repo(RepoError),
}

impl OnboardingError {
    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::SessionMismatch => SESSION_MISMATCH_MESSAGE,
            Self::InvalidInviteCode => INVALID_INVITE_CODE_MESSAGE,
            Self::InvalidFamilyName => INVALID_FAMILY_NAME_MESSAGE,
            Self::Family(_) | Self::Repo(_) => FAMILY_SETUP_FAILED_MESSAGE,
        }
    }
}

impl Display for OnboardingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Family(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            other => write!(f, "{}", other.user_message()),
        }
    }
}

impl Error for OnboardingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Family(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SessionError> for OnboardingError {
    fn from(value: SessionError) -> Self {
        match value {
            SessionError::Mismatch => Self::SessionMismatch,
            SessionError::Repo(err) => Self::Repo(err),
        }
    }
}

impl From<FamilyServiceError> for OnboardingError {
    fn from(value: FamilyServiceError) -> Self {
        match value {
            FamilyServiceError::InvalidFamilyName => Self::InvalidFamilyName,
            other => Self::Family(other),
        }
    }
}

impl From<RepoError> for OnboardingError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Result of a completed onboarding step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnboardingOutcome {
    /// Signed-in user, already pointing at `family`.
    pub user: User,
    pub family: Family,
}

/// Session-guarded family setup.
pub struct OnboardingService<S, F, U>
where
    S: SessionRepository,
    F: FamilyRepository,
    U: UserRepository,
{
    session: SessionService<S, U>,
    families: FamilyService<F, U>,
}

impl<S, F, U> OnboardingService<S, F, U>
where
    S: SessionRepository,
    F: FamilyRepository,
    U: UserRepository,
{
    /// Creates a service from its session and family collaborators.
    pub fn new(session: SessionService<S, U>, families: FamilyService<F, U>) -> Self {
        Self { session, families }
    }

    /// Creates a family as `acting_user_id`.
    pub fn create_family(
        &self,
        name: &str,
        acting_user_id: &str,
    ) -> Result<OnboardingOutcome, OnboardingError> {
        let user = self.session.require_session_user(acting_user_id)?;
        let family = self.families.create_family(name, &user)?;
        self.complete(family)
    }

    /// Joins the family owning `invite_code` as `acting_user_id`.
    pub fn join_family(
        &self,
        invite_code: &str,
        acting_user_id: &str,
    ) -> Result<OnboardingOutcome, OnboardingError> {
        let user = self.session.require_session_user(acting_user_id)?;
        let family = self
            .families
            .join_family(invite_code, &user)?
            .ok_or(OnboardingError::InvalidInviteCode)?;
        self.complete(family)
    }

    fn complete(&self, family: Family) -> Result<OnboardingOutcome, OnboardingError> {
        let user = self
            .session
            .get_session()?
            .ok_or(OnboardingError::SessionMismatch)?;
        Ok(OnboardingOutcome { user, family })
    }
}
