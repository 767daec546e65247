use crate::error::ProfileError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque 128-bit profile identifier.
///
/// The nil UUID is the "unset" sentinel: storage assigns a fresh identifier
/// to any insert that still carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(Uuid);

impl ProfileId {
    /// Generate a new random (v4) identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    pub fn is_set(&self) -> bool {
        !self.0.is_nil()
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

/// The unset identifier.
impl Default for ProfileId {
    fn default() -> Self {
        Self::nil()
    }
}

impl From<Uuid> for ProfileId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ProfileId {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| ProfileError::InvalidArgument(format!("invalid profile id '{s}': {e}")))
    }
}

/// A persisted profile row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub email: String,
    /// Set by the datastore on insert.
    pub created_at: DateTime<Utc>,
    /// Set by the datastore on insert and on every email update.
    pub updated_at: DateTime<Utc>,
}

/// Insert payload: the only fields a caller may choose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfile {
    pub id: ProfileId,
    pub email: String,
}

impl NewProfile {
    /// Payload with an unset identifier; storage assigns one.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            id: ProfileId::nil(),
            email: email.into(),
        }
    }

    pub fn with_id(id: ProfileId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
        }
    }

    /// Replace an unset identifier with a freshly generated one.
    pub fn assign_id_if_unset(mut self) -> Self {
        if !self.id.is_set() {
            self.id = ProfileId::new();
        }
        self
    }
}
