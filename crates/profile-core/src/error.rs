use std::fmt::Display;
use thiserror::Error;

/// Result type for profile operations.
pub type ProfileResult<T> = Result<T, ProfileError>;

/// Profile domain errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    /// Malformed caller input, rejected before storage is touched.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Email uniqueness violation.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Opaque datastore failure.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl ProfileError {
    pub fn profile_not_found(id: impl Display) -> Self {
        Self::NotFound(format!("profile {id} not found"))
    }

    pub fn email_not_found(email: &str) -> Self {
        Self::NotFound(format!("profile with email '{email}' not found"))
    }

    pub fn email_taken(email: &str) -> Self {
        Self::Conflict(format!("email '{email}' already exists"))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}
