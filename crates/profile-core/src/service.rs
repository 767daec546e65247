//! Business rules layered over [`ProfileStore`].
//!
//! The service trusts its caller on email syntax and enforces uniqueness
//! itself. The `is_email_exist` pre-check is a fast path only; the store's
//! unique constraint has the final word when two requests race.

use crate::model::{NewProfile, Profile, ProfileId};
use crate::storage::ProfileStore;
use crate::{ProfileError, ProfileResult};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Profile create/read/update/delete orchestration.
pub struct ProfileService<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for ProfileService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: ProfileStore + ?Sized> ProfileService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    #[instrument(skip(self), fields(op = "service.profile.create"))]
    pub async fn create(&self, email: &str) -> ProfileResult<Profile> {
        info!("creating new profile");

        debug!("checking whether email exists");
        if self.store.is_email_exist(email).await? {
            info!("email already exists");
            return Err(ProfileError::email_taken(email));
        }

        let profile = self
            .store
            .insert(NewProfile::with_id(ProfileId::new(), email))
            .await?;

        info!(id = %profile.id, "created profile");
        Ok(profile)
    }

    #[instrument(skip(self), fields(op = "service.profile.get_by_id"))]
    pub async fn get_by_id(&self, id: ProfileId) -> ProfileResult<Profile> {
        let profile = self.store.get_by_id(id).await?;
        debug!("fetched profile");
        Ok(profile)
    }

    #[instrument(skip(self), fields(op = "service.profile.get_by_email"))]
    pub async fn get_by_email(&self, email: &str) -> ProfileResult<Profile> {
        let profile = self.store.get_by_email(email).await?;
        debug!(id = %profile.id, "fetched profile");
        Ok(profile)
    }

    /// Change a profile's email.
    ///
    /// Fails with `Conflict` when the address belongs to a different profile
    /// and with `NotFound` when `id` does not exist. Re-submitting the current
    /// address succeeds and only refreshes `updated_at`.
    #[instrument(skip(self), fields(op = "service.profile.update_email"))]
    pub async fn update_email(&self, id: ProfileId, new_email: &str) -> ProfileResult<Profile> {
        info!("updating profile email");

        debug!("checking whether new email is taken");
        match self.store.get_by_email(new_email).await {
            Ok(owner) if owner.id != id => {
                warn!(owner = %owner.id, "email already exists");
                return Err(ProfileError::email_taken(new_email));
            }
            Ok(_) | Err(ProfileError::NotFound(_)) => {}
            Err(err) => return Err(err),
        }

        debug!("checking whether profile exists");
        if !self.store.is_exist(id).await? {
            warn!("profile not found");
            return Err(ProfileError::profile_not_found(id));
        }

        let profile = self.store.update_email(id, new_email).await?;
        info!("updated profile email");
        Ok(profile)
    }

    #[instrument(skip(self), fields(op = "service.profile.delete_by_id"))]
    pub async fn delete_by_id(&self, id: ProfileId) -> ProfileResult<()> {
        debug!("checking whether profile exists");
        if !self.store.is_exist(id).await? {
            info!("profile not found");
            return Err(ProfileError::profile_not_found(id));
        }

        self.store.delete(id).await?;
        info!("deleted profile");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::failing::FailingProfileStore;
    use crate::storage::recording::RecordingProfileStore;
    use crate::InMemoryProfileStore;

    fn service() -> ProfileService<InMemoryProfileStore> {
        ProfileService::new(Arc::new(InMemoryProfileStore::new()))
    }

    #[tokio::test]
    async fn create_then_get_returns_same_email_and_timestamps() {
        let svc = service();
        let created = svc.create("a@example.com").await.unwrap();

        let fetched = svc.get_by_id(created.id).await.unwrap();
        assert_eq!(fetched.email, "a@example.com");
        assert!(fetched.created_at.timestamp() > 0);
        assert!(fetched.updated_at.timestamp() > 0);
    }

    #[tokio::test]
    async fn create_with_existing_email_conflicts_without_new_row() {
        let svc = service();
        svc.create("x@test.com").await.unwrap();

        let err = svc.create("x@test.com").await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(svc.store().len().unwrap(), 1);
    }

    #[tokio::test]
    async fn create_skips_insert_when_precheck_finds_email() {
        let svc = ProfileService::new(Arc::new(RecordingProfileStore::new(
            InMemoryProfileStore::new(),
        )));
        svc.create("x@test.com").await.unwrap();
        let before = svc.store().calls();

        assert!(svc.create("x@test.com").await.unwrap_err().is_conflict());
        // Only the email check ran.
        assert_eq!(svc.store().calls(), before + 1);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found_everywhere() {
        let svc = service();
        let id = ProfileId::new();

        assert!(svc.get_by_id(id).await.unwrap_err().is_not_found());
        assert!(svc
            .update_email(id, "b@example.com")
            .await
            .unwrap_err()
            .is_not_found());
        assert!(svc.delete_by_id(id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn delete_twice_second_is_not_found() {
        let svc = service();
        let created = svc.create("a@example.com").await.unwrap();

        svc.delete_by_id(created.id).await.unwrap();
        assert!(svc.delete_by_id(created.id).await.unwrap_err().is_not_found());
        assert!(svc.get_by_id(created.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn update_then_get_reflects_new_email() {
        let svc = service();
        let created = svc.create("a@example.com").await.unwrap();

        svc.update_email(created.id, "b@example.com").await.unwrap();
        let fetched = svc.get_by_id(created.id).await.unwrap();
        assert_eq!(fetched.email, "b@example.com");
        assert!(fetched.updated_at >= created.created_at);
    }

    #[tokio::test]
    async fn update_to_email_of_another_profile_conflicts() {
        let svc = service();
        let first = svc.create("a@example.com").await.unwrap();
        svc.create("b@example.com").await.unwrap();

        let err = svc.update_email(first.id, "b@example.com").await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(svc.get_by_id(first.id).await.unwrap().email, "a@example.com");
    }

    #[tokio::test]
    async fn update_to_own_email_is_accepted() {
        let svc = service();
        let created = svc.create("a@example.com").await.unwrap();

        let updated = svc.update_email(created.id, "a@example.com").await.unwrap();
        assert_eq!(updated.email, "a@example.com");
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn get_by_email_finds_created_profile() {
        let svc = service();
        let created = svc.create("a@example.com").await.unwrap();

        assert_eq!(svc.get_by_email("a@example.com").await.unwrap().id, created.id);
        assert!(svc
            .get_by_email("missing@example.com")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_creates_with_same_email_do_not_both_succeed() {
        for round in 0..50 {
            let svc = service();
            let email = format!("race-{round}@example.com");
            let barrier = Arc::new(tokio::sync::Barrier::new(8));
            let tasks: Vec<_> = (0..8)
                .map(|_| {
                    let svc = svc.clone();
                    let email = email.clone();
                    let barrier = Arc::clone(&barrier);
                    tokio::spawn(async move {
                        barrier.wait().await;
                        svc.create(&email).await
                    })
                })
                .collect();

            let mut successes = 0;
            for task in tasks {
                match task.await.unwrap() {
                    Ok(_) => successes += 1,
                    Err(err) => assert!(err.is_conflict()),
                }
            }

            assert_eq!(successes, 1, "round {round}");
            assert_eq!(svc.store().len().unwrap(), 1, "round {round}");
        }
    }

    #[tokio::test]
    async fn failed_email_check_blocks_create() {
        let svc = ProfileService::new(Arc::new(FailingProfileStore::new()));

        let err = svc.create("a@example.com").await.unwrap_err();
        assert!(matches!(err, ProfileError::Persistence(_)));
        assert_eq!(svc.store().writes(), 0);
    }

    #[tokio::test]
    async fn failed_existence_check_is_not_reported_as_missing() {
        let svc = ProfileService::new(Arc::new(FailingProfileStore::new()));
        let id = ProfileId::new();

        let err = svc.delete_by_id(id).await.unwrap_err();
        assert!(matches!(err, ProfileError::Persistence(_)));
        let err = svc.update_email(id, "b@example.com").await.unwrap_err();
        assert!(matches!(err, ProfileError::Persistence(_)));
        assert_eq!(svc.store().writes(), 0);
    }
}
