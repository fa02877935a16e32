//! Household domain model: users, families and utility logs.
//!
//! # Responsibility
//! - Define the canonical records shared by repositories and services.
//! - Own field-level validation that every write path must pass.
//!
//! # Invariants
//! - A user is identified by its lowercased email.
//! - A family's creator is always one of its members.
//! - Logs are immutable; removal is the only lifecycle transition.

pub mod family;
pub mod user;
pub mod utility_log;
pub mod validation;
