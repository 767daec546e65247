//! Call-counting wrapper used by tests to observe storage traffic.

use crate::model::{NewProfile, Profile, ProfileId};
use crate::storage::ProfileStore;
use crate::ProfileResult;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Delegates to an inner store and counts every call made through it.
#[derive(Debug, Default)]
pub struct RecordingProfileStore<S> {
    inner: S,
    calls: AtomicUsize,
}

impl<S: ProfileStore> RecordingProfileStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl<S: ProfileStore> ProfileStore for RecordingProfileStore<S> {
    async fn insert(&self, profile: NewProfile) -> ProfileResult<Profile> {
        self.record();
        self.inner.insert(profile).await
    }

    async fn get_by_id(&self, id: ProfileId) -> ProfileResult<Profile> {
        self.record();
        self.inner.get_by_id(id).await
    }

    async fn get_by_email(&self, email: &str) -> ProfileResult<Profile> {
        self.record();
        self.inner.get_by_email(email).await
    }

    async fn is_exist(&self, id: ProfileId) -> ProfileResult<bool> {
        self.record();
        self.inner.is_exist(id).await
    }

    async fn is_email_exist(&self, email: &str) -> ProfileResult<bool> {
        self.record();
        self.inner.is_email_exist(email).await
    }

    async fn update_email(&self, id: ProfileId, new_email: &str) -> ProfileResult<Profile> {
        self.record();
        self.inner.update_email(id, new_email).await
    }

    async fn delete(&self, id: ProfileId) -> ProfileResult<()> {
        self.record();
        self.inner.delete(id).await
    }

    fn backend_label(&self) -> &'static str {
        self.inner.backend_label()
    }
}
