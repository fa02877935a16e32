//! Household use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into sign-in, family, session and log flows.
//! - Keep callers decoupled from storage details.

pub mod family_service;
pub mod identity_service;
pub mod insight_service;
pub mod log_service;
pub mod onboarding_service;
pub mod session_service;
