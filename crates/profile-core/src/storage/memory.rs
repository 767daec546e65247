//! In-memory reference implementation of [`ProfileStore`].
//!
//! Mirrors the PostgreSQL adapter's semantics, including the unique email
//! constraint, which is checked and applied under a single write lock.

use crate::model::{NewProfile, Profile, ProfileId};
use crate::storage::ProfileStore;
use crate::{ProfileError, ProfileResult};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, instrument};

#[derive(Debug, Default)]
struct Tables {
    by_id: HashMap<ProfileId, Profile>,
    /// Unique email index.
    by_email: HashMap<String, ProfileId>,
}

/// In-memory profile table.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    tables: RwLock<Tables>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> ProfileResult<usize> {
        Ok(self.read()?.by_id.len())
    }

    pub fn is_empty(&self) -> ProfileResult<bool> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> ProfileResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| ProfileError::Persistence("profile table lock poisoned".to_string()))
    }

    fn write(&self) -> ProfileResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| ProfileError::Persistence("profile table lock poisoned".to_string()))
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    #[instrument(skip(self), fields(op = "storage.memory.insert"))]
    async fn insert(&self, profile: NewProfile) -> ProfileResult<Profile> {
        let profile = profile.assign_id_if_unset();
        let mut tables = self.write()?;

        if tables.by_email.contains_key(&profile.email) {
            return Err(ProfileError::email_taken(&profile.email));
        }
        if tables.by_id.contains_key(&profile.id) {
            return Err(ProfileError::Conflict(format!(
                "profile {} already exists",
                profile.id
            )));
        }

        let now = Utc::now();
        let stored = Profile {
            id: profile.id,
            email: profile.email,
            created_at: now,
            updated_at: now,
        };
        tables.by_email.insert(stored.email.clone(), stored.id);
        tables.by_id.insert(stored.id, stored.clone());
        debug!(id = %stored.id, "profile inserted");
        Ok(stored)
    }

    async fn get_by_id(&self, id: ProfileId) -> ProfileResult<Profile> {
        self.read()?
            .by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| ProfileError::profile_not_found(id))
    }

    async fn get_by_email(&self, email: &str) -> ProfileResult<Profile> {
        let tables = self.read()?;
        tables
            .by_email
            .get(email)
            .and_then(|id| tables.by_id.get(id))
            .cloned()
            .ok_or_else(|| ProfileError::email_not_found(email))
    }

    async fn is_exist(&self, id: ProfileId) -> ProfileResult<bool> {
        Ok(self.read()?.by_id.contains_key(&id))
    }

    async fn is_email_exist(&self, email: &str) -> ProfileResult<bool> {
        Ok(self.read()?.by_email.contains_key(email))
    }

    #[instrument(skip(self), fields(op = "storage.memory.update_email"))]
    async fn update_email(&self, id: ProfileId, new_email: &str) -> ProfileResult<Profile> {
        let mut tables = self.write()?;

        if let Some(owner) = tables.by_email.get(new_email) {
            if *owner != id {
                return Err(ProfileError::email_taken(new_email));
            }
        }

        let Tables { by_id, by_email } = &mut *tables;
        let record = by_id
            .get_mut(&id)
            .ok_or_else(|| ProfileError::profile_not_found(id))?;

        by_email.remove(&record.email);
        by_email.insert(new_email.to_string(), id);
        record.email = new_email.to_string();
        record.updated_at = Utc::now().max(record.created_at);
        debug!("profile email updated");
        Ok(record.clone())
    }

    #[instrument(skip(self), fields(op = "storage.memory.delete"))]
    async fn delete(&self, id: ProfileId) -> ProfileResult<()> {
        let mut tables = self.write()?;
        let removed = tables
            .by_id
            .remove(&id)
            .ok_or_else(|| ProfileError::profile_not_found(id))?;
        tables.by_email.remove(&removed.email);
        debug!("profile deleted");
        Ok(())
    }

    fn backend_label(&self) -> &'static str {
        "memory"
    }
}
