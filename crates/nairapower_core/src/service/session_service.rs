//! Session use-case service.
//!
//! # Responsibility
//! - Remember which user is signed in across restarts.
//! - Resolve the signed-in user through the user store on every read.
//!
//! # Invariants
//! - The session holds a user id, never a user snapshot.
//! - A session naming a missing user reads as signed out.

use crate::model::user::User;
use crate::repo::session_repo::SessionRepository;
use crate::repo::user_repo::UserRepository;
use crate::repo::RepoError;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from session checks.
#[derive(Debug)]
pub enum SessionError {
    /// No session, or the session belongs to another user.
    Mismatch,
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mismatch => write!(f, "acting user does not match the signed-in session"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Mismatch => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for SessionError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Session holder over repository implementations.
pub struct SessionService<S: SessionRepository, U: UserRepository> {
    sessions: S,
    users: U,
}

impl<S: SessionRepository, U: UserRepository> SessionService<S, U> {
    /// Creates a service using the provided repository implementations.
    pub fn new(sessions: S, users: U) -> Self {
        Self { sessions, users }
    }

    /// Marks `user` as the signed-in user.
    pub fn save_session(&self, user: &User) -> Result<(), SessionError> {
        self.sessions.save_session(&user.id)?;
        info!("event=session_save module=session status=ok");
        Ok(())
    }

    /// Returns the signed-in user as currently stored.
    pub fn get_session(&self) -> Result<Option<User>, SessionError> {
        let Some(user_id) = self.sessions.load_session()? else {
            return Ok(None);
        };

        let user = self.users.get_user(&user_id)?;
        if user.is_none() {
            warn!("event=session_load module=session status=stale error_code=user_missing");
        }
        Ok(user)
    }

    /// Signs out.
    pub fn clear_session(&self) -> Result<(), SessionError> {
        self.sessions.clear_session()?;
        info!("event=session_clear module=session status=ok");
        Ok(())
    }

    /// Returns the signed-in user when it is `acting_user_id`.
    pub fn require_session_user(&self, acting_user_id: &str) -> Result<User, SessionError> {
        match self.get_session()? {
            Some(user) if user.id == acting_user_id => Ok(user),
            _ => {
                warn!("event=session_check module=session status=rejected error_code=session_mismatch");
                Err(SessionError::Mismatch)
            }
        }
    }
}
