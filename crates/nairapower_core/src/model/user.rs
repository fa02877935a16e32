//! User domain model.
//!
//! # Responsibility
//! - Define the registered household member record.
//! - Derive display name and avatar for first-time registrations.
//!
//! # Invariants
//! - `id` equals the trimmed, lowercased email and never changes.
//! - Only `name` and `family_id` may change after creation.

use crate::model::family::FamilyId;
use crate::model::validation::{require_text, ModelValidationError};
use serde::{Deserialize, Serialize};

/// User identifier. Always the normalized email.
pub type UserId = String;

const AVATAR_BASE_URL: &str = "https://ui-avatars.com/api/";

/// Registered household member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    /// Generated avatar image URL.
    pub avatar: String,
    /// `None` until the user creates or joins a family.
    pub family_id: Option<FamilyId>,
}

impl User {
    /// Builds a new, family-less user for a first sign-in.
    ///
    /// A blank or missing `name` falls back to the email local part with its
    /// first letter capitalized.
    pub fn register(email: &str, name: Option<&str>) -> Self {
        let normalized = normalize_email(email);
        let display_name = match name.map(str::trim) {
            Some(value) if !value.is_empty() => value.to_string(),
            _ => display_name_from_email(email),
        };

        Self {
            id: normalized.clone(),
            avatar: avatar_url(&display_name),
            name: display_name,
            email: normalized,
            family_id: None,
        }
    }

    /// Checks field-level invariants before persistence.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("user", "email", &self.email)?;
        require_text("user", "name", &self.name)?;
        if self.id != normalize_email(&self.email) {
            return Err(ModelValidationError::UserIdMismatch {
                id: self.id.clone(),
                email: self.email.clone(),
            });
        }
        Ok(())
    }

    /// Returns whether the user belongs to a family.
    pub fn has_family(&self) -> bool {
        self.family_id.is_some()
    }
}

/// Normalizes an email into its identity form.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Capitalizes the email local part. Falls back to the whole email when the
/// local part is empty.
pub fn display_name_from_email(email: &str) -> String {
    let trimmed = email.trim();
    let local_part = trimmed.split('@').next().unwrap_or_default();
    let source = if local_part.is_empty() {
        trimmed
    } else {
        local_part
    };

    let mut chars = source.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Builds the generated avatar URL for a display name.
pub fn avatar_url(name: &str) -> String {
    format!(
        "{AVATAR_BASE_URL}?name={}&background=random&color=fff&bold=true",
        urlencoding::encode(name)
    )
}

#[cfg(test)]
mod tests {
    use super::{avatar_url, display_name_from_email, User};

    #[test]
    fn register_derives_name_from_email_local_part() {
        let user = User::register("  Kemi@Example.com ", None);
        assert_eq!(user.id, "kemi@example.com");
        assert_eq!(user.email, "kemi@example.com");
        assert_eq!(user.name, "Kemi");
        assert!(user.family_id.is_none());
        assert!(user.validate().is_ok());
    }

    #[test]
    fn register_prefers_non_blank_supplied_name() {
        assert_eq!(User::register("a@b.com", Some(" Ada ")).name, "Ada");
        assert_eq!(User::register("tunde@b.com", Some("   ")).name, "Tunde");
    }

    #[test]
    fn display_name_handles_missing_local_part() {
        assert_eq!(display_name_from_email("@host"), "@host");
        assert_eq!(display_name_from_email("plain"), "Plain");
    }

    #[test]
    fn avatar_url_encodes_name() {
        let url = avatar_url("Mama Ngozi");
        assert!(url.starts_with("https://ui-avatars.com/api/?name=Mama%20Ngozi"));
        assert!(url.ends_with("&bold=true"));
    }

    #[test]
    fn validate_rejects_id_that_differs_from_email() {
        let mut user = User::register("dad@home.ng", None);
        user.id = "someone-else".to_string();
        assert!(user.validate().is_err());
    }
}
