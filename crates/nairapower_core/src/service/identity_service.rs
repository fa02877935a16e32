//! Identity use-case service.
//!
//! # Responsibility
//! - Resolve an email to a user, registering first-time emails.
//! - Provision the demo household for the demo account.
//!
//! # Invariants
//! - Registration is idempotent per email: returning users come back
//!   unchanged, whatever name is supplied.
//! - The demo household is created at most once (looked up by name).
//! - Demo registration is all-or-nothing: the user, the household and its
//!   seed logs are written in one transaction, so a failed attempt leaves
//!   nothing behind and the next sign-in starts over.

use crate::model::family::Family;
use crate::model::user::{User, UserId};
use crate::model::utility_log::UtilityLog;
use crate::repo::family_repo::FamilyRepository;
use crate::repo::user_repo::UserRepository;
use crate::repo::RepoError;
use chrono::{NaiveDate, Utc};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Account that gets a pre-seeded household on first sign-in.
pub const DEMO_EMAIL: &str = "demo@gmail.com";
pub const DEMO_FAMILY_ID: &str = "demo-family-id";
pub const DEMO_FAMILY_NAME: &str = "Demo Household";
pub const DEMO_INVITE_CODE: &str = "DEMO123";

/// Errors from identity operations.
#[derive(Debug)]
pub enum IdentityError {
    /// Email is blank after trim.
    InvalidEmail,
    /// Display name is blank after trim.
    InvalidName,
    /// Target user does not exist.
    UserNotFound(UserId),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for IdentityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidEmail => write!(f, "email must not be blank"),
            Self::InvalidName => write!(f, "display name must not be blank"),
            Self::UserNotFound(id) => write!(f, "user not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for IdentityError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for IdentityError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "user",
                id,
            } => Self::UserNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Sign-in and user profile service.
pub struct IdentityService<U: UserRepository, F: FamilyRepository> {
    users: U,
    families: F,
}

impl<U: UserRepository, F: FamilyRepository> IdentityService<U, F> {
    /// Creates a service using the provided repository implementations.
    pub fn new(users: U, families: F) -> Self {
        Self { users, families }
    }

    /// Returns the user registered under `email`, registering it if absent.
    ///
    /// # Contract
    /// - Lookup ignores case and surrounding whitespace.
    /// - Existing users are returned unchanged; `name` only applies to new
    ///   registrations.
    /// - The demo account is placed into the demo household.
    pub fn get_or_register_user(
        &self,
        email: &str,
        name: Option<&str>,
    ) -> Result<User, IdentityError> {
        if email.trim().is_empty() {
            return Err(IdentityError::InvalidEmail);
        }

        if let Some(existing) = self.users.find_by_email(email)? {
            info!(
                "event=user_sign_in module=identity status=ok registered=false has_family={}",
                existing.has_family()
            );
            return Ok(existing);
        }

        let user = User::register(email, name);
        if user.email == DEMO_EMAIL {
            return self.register_demo_user(user);
        }

        self.users.create_user(&user)?;
        info!("event=user_sign_in module=identity status=ok registered=true");
        Ok(user)
    }

    /// Gets one user by id.
    pub fn get_user(&self, id: &str) -> Result<Option<User>, IdentityError> {
        Ok(self.users.get_user(id)?)
    }

    /// Gets users in the order of `ids`, skipping unknown ids.
    pub fn get_users(&self, ids: &[UserId]) -> Result<Vec<User>, IdentityError> {
        Ok(self.users.get_users(ids)?)
    }

    /// Changes a user's display name and returns the updated record.
    pub fn update_user_name(&self, id: &str, name: &str) -> Result<User, IdentityError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(IdentityError::InvalidName);
        }

        self.users.rename_user(id, name)?;
        self.users
            .get_user(id)?
            .ok_or_else(|| IdentityError::UserNotFound(id.to_string()))
    }

    fn register_demo_user(&self, user: User) -> Result<User, IdentityError> {
        match self.families.find_by_name(DEMO_FAMILY_NAME)? {
            Some(family) => {
                self.families.add_new_member(&family.id, &user)?;
                info!("event=demo_provision module=identity status=ok created=false");
            }
            None => {
                let family = Family::with_id(
                    DEMO_FAMILY_ID,
                    DEMO_FAMILY_NAME,
                    user.id.clone(),
                    DEMO_INVITE_CODE,
                    Utc::now().timestamp_millis(),
                );
                let seed_logs = demo_seed_logs();
                self.families
                    .create_family_for_new_user(&user, &family, &seed_logs)?;
                info!(
                    "event=demo_provision module=identity status=ok created=true seeded_logs={}",
                    seed_logs.len()
                );
            }
        }

        self.users
            .get_user(&user.id)?
            .ok_or(IdentityError::UserNotFound(user.id))
    }
}

/// Sample logs seeded into a freshly created demo household.
///
/// Ids are generated per call so seeding never collides with stored logs.
pub fn demo_seed_logs() -> Vec<UtilityLog> {
    vec![
        UtilityLog {
            id: Uuid::new_v4(),
            family_id: DEMO_FAMILY_ID.to_string(),
            user_id: DEMO_EMAIL.to_string(),
            user_name: "Dad".to_string(),
            date: NaiveDate::from_ymd_opt(2023, 10, 1).expect("valid demo seed date"),
            units: 150.0,
            amount: 15000.0,
            previous_reading: 12400.0,
            created_at: 1_696_118_400_000,
        },
        UtilityLog {
            id: Uuid::new_v4(),
            family_id: DEMO_FAMILY_ID.to_string(),
            user_id: "mom@gmail.com".to_string(),
            user_name: "Mom".to_string(),
            date: NaiveDate::from_ymd_opt(2023, 10, 15).expect("valid demo seed date"),
            units: 120.0,
            amount: 12000.0,
            previous_reading: 12550.0,
            created_at: 1_697_328_000_000,
        },
    ]
}
