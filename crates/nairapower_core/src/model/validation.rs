//! Field-level validation errors shared by all domain records.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Validation failure raised by `validate()` on domain records.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelValidationError {
    /// A required text field is blank after trim.
    EmptyField {
        entity: &'static str,
        field: &'static str,
    },
    /// User id must equal the normalized email.
    UserIdMismatch { id: String, email: String },
    /// Numeric quantity is negative, NaN or infinite.
    InvalidQuantity { field: &'static str, value: f64 },
    /// Family creator is missing from the member list.
    CreatorNotMember { family_id: String },
    /// The same user appears twice in a member list.
    DuplicateMember { family_id: String, user_id: String },
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField { entity, field } => {
                write!(f, "{entity}.{field} must not be blank")
            }
            Self::UserIdMismatch { id, email } => {
                write!(f, "user id `{id}` does not match normalized email `{email}`")
            }
            Self::InvalidQuantity { field, value } => {
                write!(f, "{field} must be a finite non-negative number, got {value}")
            }
            Self::CreatorNotMember { family_id } => {
                write!(f, "family {family_id} creator is not a member")
            }
            Self::DuplicateMember { family_id, user_id } => {
                write!(f, "family {family_id} lists member {user_id} more than once")
            }
        }
    }
}

impl Error for ModelValidationError {}

pub(crate) fn require_text(
    entity: &'static str,
    field: &'static str,
    value: &str,
) -> Result<(), ModelValidationError> {
    if value.trim().is_empty() {
        return Err(ModelValidationError::EmptyField { entity, field });
    }
    Ok(())
}

pub(crate) fn require_quantity(field: &'static str, value: f64) -> Result<(), ModelValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ModelValidationError::InvalidQuantity { field, value });
    }
    Ok(())
}
