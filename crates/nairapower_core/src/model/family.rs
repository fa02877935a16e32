//! Family domain model and invite-code helpers.
//!
//! # Responsibility
//! - Define the family group record and its ordered member list.
//! - Generate and normalize invite codes.
//!
//! # Invariants
//! - `creator_id` is always contained in `member_ids`.
//! - `member_ids` has no duplicates and keeps join order.

use crate::model::user::UserId;
use crate::model::validation::{require_text, ModelValidationError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Family identifier. Opaque text; generated families use a UUID.
pub type FamilyId = String;

/// Length of generated invite codes.
pub const INVITE_CODE_LEN: usize = 6;

const INVITE_CODE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Group of users sharing one pool of utility logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Family {
    pub id: FamilyId,
    pub name: String,
    pub creator_id: UserId,
    /// Shared token that grants join access.
    pub invite_code: String,
    /// Ordered by join time; the creator comes first.
    pub member_ids: Vec<UserId>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl Family {
    /// Creates a family with a generated id and the creator as sole member.
    pub fn new(
        name: impl Into<String>,
        creator_id: impl Into<UserId>,
        invite_code: impl Into<String>,
        created_at: i64,
    ) -> Self {
        Self::with_id(
            Uuid::new_v4().to_string(),
            name,
            creator_id,
            invite_code,
            created_at,
        )
    }

    /// Creates a family with a caller-provided id.
    ///
    /// Used for fixed records such as the demo household.
    pub fn with_id(
        id: impl Into<FamilyId>,
        name: impl Into<String>,
        creator_id: impl Into<UserId>,
        invite_code: impl Into<String>,
        created_at: i64,
    ) -> Self {
        let creator_id = creator_id.into();
        Self {
            id: id.into(),
            name: name.into(),
            member_ids: vec![creator_id.clone()],
            creator_id,
            invite_code: invite_code.into(),
            created_at,
        }
    }

    /// Returns whether `user_id` is in the member list.
    pub fn is_member(&self, user_id: &str) -> bool {
        self.member_ids.iter().any(|member| member == user_id)
    }

    /// Checks membership and field invariants before persistence.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("family", "id", &self.id)?;
        require_text("family", "name", &self.name)?;
        require_text("family", "invite_code", &self.invite_code)?;

        if !self.is_member(&self.creator_id) {
            return Err(ModelValidationError::CreatorNotMember {
                family_id: self.id.clone(),
            });
        }

        let mut seen = HashSet::with_capacity(self.member_ids.len());
        for member in &self.member_ids {
            if !seen.insert(member.as_str()) {
                return Err(ModelValidationError::DuplicateMember {
                    family_id: self.id.clone(),
                    user_id: member.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Generates a random base-36 uppercase invite code.
pub fn generate_invite_code() -> String {
    let mut rng = rand::rng();
    (0..INVITE_CODE_LEN)
        .map(|_| {
            let index = rng.random_range(0..INVITE_CODE_ALPHABET.len());
            char::from(INVITE_CODE_ALPHABET[index])
        })
        .collect()
}

/// Normalizes user-typed invite codes (trim + uppercase).
pub fn normalize_invite_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::{generate_invite_code, normalize_invite_code, Family, INVITE_CODE_LEN};

    #[test]
    fn generated_invite_code_is_six_uppercase_alphanumerics() {
        for _ in 0..64 {
            let code = generate_invite_code();
            assert_eq!(code.len(), INVITE_CODE_LEN);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn normalize_invite_code_trims_and_uppercases() {
        assert_eq!(normalize_invite_code("  ab12cd \n"), "AB12CD");
    }

    #[test]
    fn new_family_has_creator_as_sole_member() {
        let family = Family::new("Test House", "a@x.com", "ABC123", 1);
        assert_eq!(family.member_ids, vec!["a@x.com".to_string()]);
        assert!(family.validate().is_ok());
    }

    #[test]
    fn validate_rejects_duplicate_members_and_missing_creator() {
        let mut family = Family::new("Test House", "a@x.com", "ABC123", 1);
        family.member_ids.push("a@x.com".to_string());
        assert!(family.validate().is_err());

        family.member_ids = vec!["b@x.com".to_string()];
        assert!(family.validate().is_err());
    }
}
