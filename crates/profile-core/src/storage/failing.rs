//! Store whose backend is permanently unavailable, for exercising error paths.

use crate::model::{NewProfile, Profile, ProfileId};
use crate::storage::ProfileStore;
use crate::{ProfileError, ProfileResult};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fails every call with [`ProfileError::Persistence`] and counts writes.
#[derive(Debug, Default)]
pub struct FailingProfileStore {
    writes: AtomicUsize,
}

impl FailingProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of insert, update, or delete calls that reached the store.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn unavailable<T>(&self, op: &str) -> ProfileResult<T> {
        Err(ProfileError::Persistence(format!("{op}: backend unavailable")))
    }

    fn write<T>(&self, op: &str) -> ProfileResult<T> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.unavailable(op)
    }
}

#[async_trait]
impl ProfileStore for FailingProfileStore {
    async fn insert(&self, _profile: NewProfile) -> ProfileResult<Profile> {
        self.write("insert")
    }

    async fn get_by_id(&self, _id: ProfileId) -> ProfileResult<Profile> {
        self.unavailable("get_by_id")
    }

    async fn get_by_email(&self, _email: &str) -> ProfileResult<Profile> {
        self.unavailable("get_by_email")
    }

    async fn is_exist(&self, _id: ProfileId) -> ProfileResult<bool> {
        self.unavailable("is_exist")
    }

    async fn is_email_exist(&self, _email: &str) -> ProfileResult<bool> {
        self.unavailable("is_email_exist")
    }

    async fn update_email(&self, _id: ProfileId, _new_email: &str) -> ProfileResult<Profile> {
        self.write("update_email")
    }

    async fn delete(&self, _id: ProfileId) -> ProfileResult<()> {
        self.write("delete")
    }

    fn backend_label(&self) -> &'static str {
        "failing"
    }
}
