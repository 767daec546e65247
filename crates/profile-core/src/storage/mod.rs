//! Storage contract for the `profile` table and its adapters.
//!
//! Adapters translate "no matching row" into [`ProfileError::NotFound`] and
//! unique-constraint violations into [`ProfileError::Conflict`]; every other
//! backend failure surfaces as [`ProfileError::Persistence`].
//!
//! [`ProfileError::NotFound`]: crate::ProfileError::NotFound
//! [`ProfileError::Conflict`]: crate::ProfileError::Conflict
//! [`ProfileError::Persistence`]: crate::ProfileError::Persistence

use crate::model::{NewProfile, Profile, ProfileId};
use crate::ProfileResult;
use async_trait::async_trait;

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(any(test, feature = "test-util"))]
pub mod failing;
#[cfg(any(test, feature = "test-util"))]
pub mod recording;

pub use memory::InMemoryProfileStore;

/// Row-level persistence for profiles. Each method is a single statement.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Insert a row, assigning an identifier if the payload left it unset.
    /// Returns the stored row including server-assigned timestamps.
    async fn insert(&self, profile: NewProfile) -> ProfileResult<Profile>;

    async fn get_by_id(&self, id: ProfileId) -> ProfileResult<Profile>;

    async fn get_by_email(&self, email: &str) -> ProfileResult<Profile>;

    /// Existence probe. Backend failures are returned, never reported as absence.
    async fn is_exist(&self, id: ProfileId) -> ProfileResult<bool>;

    /// Existence probe keyed by email.
    async fn is_email_exist(&self, email: &str) -> ProfileResult<bool>;

    /// Set a new email and bump `updated_at`, returning the updated row.
    async fn update_email(&self, id: ProfileId, new_email: &str) -> ProfileResult<Profile>;

    async fn delete(&self, id: ProfileId) -> ProfileResult<()>;

    /// Short backend name for health reporting.
    fn backend_label(&self) -> &'static str;

    /// Release backend resources on shutdown.
    async fn close(&self) {}
}
