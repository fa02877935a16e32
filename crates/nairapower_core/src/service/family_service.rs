//! Family use-case service.
//!
//! # Responsibility
//! - Create families with a unique generated invite code.
//! - Join families by invite code.
//! - Resolve families and their members.
//!
//! # Invariants
//! - A new family has exactly one member: its creator.
//! - Unknown invite codes produce `Ok(None)` and write nothing.
//! - Repeated joins never duplicate a member.

use crate::model::family::{generate_invite_code, normalize_invite_code, Family, FamilyId};
use crate::model::user::User;
use crate::repo::family_repo::FamilyRepository;
use crate::repo::user_repo::UserRepository;
use crate::repo::RepoError;
use chrono::Utc;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Upper bound on invite-code regenerations after collisions.
pub const MAX_INVITE_CODE_ATTEMPTS: u32 = 8;

/// Errors from family service operations.
#[derive(Debug)]
pub enum FamilyServiceError {
    /// Family name is blank after trim.
    InvalidFamilyName,
    /// Every generated invite code collided with an existing family.
    InviteCodeExhausted { attempts: u32 },
    /// Target family does not exist.
    FamilyNotFound(FamilyId),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for FamilyServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFamilyName => write!(f, "family name must not be blank"),
            Self::InviteCodeExhausted { attempts } => write!(
                f,
                "could not allocate a unique invite code after {attempts} attempts"
            ),
            Self::FamilyNotFound(id) => write!(f, "family not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for FamilyServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for FamilyServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "family",
                id,
            } => Self::FamilyNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Family service facade over repository implementations.
pub struct FamilyService<F: FamilyRepository, U: UserRepository> {
    families: F,
    users: U,
}

impl<F: FamilyRepository, U: UserRepository> FamilyService<F, U> {
    /// Creates a service using the provided repository implementations.
    pub fn new(families: F, users: U) -> Self {
        Self { families, users }
    }

    /// Creates a family owned by `creator` and moves the creator into it.
    ///
    /// Invite-code collisions are retried with a fresh code up to
    /// [`MAX_INVITE_CODE_ATTEMPTS`] times.
    pub fn create_family(&self, name: &str, creator: &User) -> Result<Family, FamilyServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FamilyServiceError::InvalidFamilyName);
        }

        for attempt in 1..=MAX_INVITE_CODE_ATTEMPTS {
            let family = Family::new(
                name,
                creator.id.clone(),
                generate_invite_code(),
                Utc::now().timestamp_millis(),
            );

            match self.families.create_family(&family) {
                Ok(()) => {
                    info!(
                        "event=family_create module=family status=ok family_id={} attempt={}",
                        family.id, attempt
                    );
                    return Ok(family);
                }
                Err(RepoError::DuplicateInviteCode(_)) => {
                    warn!(
                        "event=family_create module=family status=retry error_code=invite_code_collision attempt={}",
                        attempt
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(FamilyServiceError::InviteCodeExhausted {
            attempts: MAX_INVITE_CODE_ATTEMPTS,
        })
    }

    /// Joins `user` to the family owning `invite_code`.
    ///
    /// # Contract
    /// - The code is trimmed and uppercased before lookup.
    /// - Returns `Ok(None)` for unknown codes without touching storage.
    /// - Always points `user.family_id` at the joined family.
    pub fn join_family(
        &self,
        invite_code: &str,
        user: &User,
    ) -> Result<Option<Family>, FamilyServiceError> {
        let code = normalize_invite_code(invite_code);
        if code.is_empty() {
            return Ok(None);
        }

        let Some(family) = self.families.find_by_invite_code(&code)? else {
            info!("event=family_join module=family status=rejected error_code=unknown_invite_code");
            return Ok(None);
        };

        let already_member = family.is_member(&user.id);
        let family = self.families.add_member(&family.id, &user.id)?;
        info!(
            "event=family_join module=family status=ok family_id={} already_member={} member_count={}",
            family.id,
            already_member,
            family.member_ids.len()
        );
        Ok(Some(family))
    }

    /// Gets one family by id.
    pub fn get_family(&self, family_id: &str) -> Result<Option<Family>, FamilyServiceError> {
        Ok(self.families.get_family(family_id)?)
    }

    /// Lists a family's members in join order.
    pub fn list_members(&self, family_id: &str) -> Result<Vec<User>, FamilyServiceError> {
        let family = self
            .families
            .get_family(family_id)?
            .ok_or_else(|| FamilyServiceError::FamilyNotFound(family_id.to_string()))?;
        Ok(self.users.get_users(&family.member_ids)?)
    }
}
