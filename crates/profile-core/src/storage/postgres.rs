//! PostgreSQL adapter for the `profile` table.
//!
//! Email uniqueness is enforced by a `UNIQUE` constraint on the column; a
//! violation (SQLSTATE 23505) is the authoritative conflict signal.

use crate::model::{NewProfile, Profile, ProfileId};
use crate::storage::ProfileStore;
use crate::{ProfileError, ProfileResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

const PROFILE_COLUMNS: &str = "id, email, created_at, updated_at";

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS profile (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        email TEXT NOT NULL UNIQUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
"#;

/// PostgreSQL-backed profile storage.
#[derive(Debug, Clone)]
pub struct PostgresProfileStore {
    pool: PgPool,
}

impl PostgresProfileStore {
    /// Connect with default pool parameters.
    pub async fn connect(database_url: &str) -> ProfileResult<Self> {
        Self::connect_with_options(database_url, 10, 5).await
    }

    /// Connect with explicit pool parameters and verify the connection.
    pub async fn connect_with_options(
        database_url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> ProfileResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(Duration::from_secs(connect_timeout_secs))
            .connect(database_url)
            .await
            .map_err(|e| ProfileError::Persistence(format!("postgres connect failed: {e}")))?;

        let store = Self { pool };
        store.ping().await?;
        Ok(store)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ping(&self) -> ProfileResult<()> {
        debug!("pinging database");
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| ProfileError::Persistence(format!("postgres ping failed: {e}")))?;
        Ok(())
    }

    /// Create the `profile` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> ProfileResult<()> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| ProfileError::Persistence(format!("postgres schema create failed: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for PostgresProfileStore {
    #[instrument(skip(self), fields(op = "storage.postgres.insert"))]
    async fn insert(&self, profile: NewProfile) -> ProfileResult<Profile> {
        let profile = profile.assign_id_if_unset();
        let query = format!(
            "INSERT INTO profile (id, email) VALUES ($1, $2) RETURNING {PROFILE_COLUMNS}"
        );

        debug!(id = %profile.id, "inserting profile");
        let row = sqlx::query(&query)
            .bind(profile.id.into_uuid())
            .bind(&profile.email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(e, &profile.email))?;

        let stored = row_to_profile(&row)?;
        info!(id = %stored.id, "profile inserted");
        Ok(stored)
    }

    #[instrument(skip(self), fields(op = "storage.postgres.get_by_id"))]
    async fn get_by_id(&self, id: ProfileId) -> ProfileResult<Profile> {
        let query = format!("SELECT {PROFILE_COLUMNS} FROM profile WHERE id = $1");

        debug!("fetching profile");
        let row = sqlx::query(&query)
            .bind(id.into_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_query_error(e, "get_by_id"))?;

        match row {
            Some(row) => row_to_profile(&row),
            None => Err(ProfileError::profile_not_found(id)),
        }
    }

    #[instrument(skip(self), fields(op = "storage.postgres.get_by_email"))]
    async fn get_by_email(&self, email: &str) -> ProfileResult<Profile> {
        let query = format!("SELECT {PROFILE_COLUMNS} FROM profile WHERE email = $1");

        debug!("fetching profile");
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_query_error(e, "get_by_email"))?;

        match row {
            Some(row) => row_to_profile(&row),
            None => Err(ProfileError::email_not_found(email)),
        }
    }

    #[instrument(skip(self), fields(op = "storage.postgres.is_exist"))]
    async fn is_exist(&self, id: ProfileId) -> ProfileResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM profile WHERE id = $1)")
                .bind(id.into_uuid())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_query_error(e, "is_exist"))?;

        debug!(exists, "checked profile");
        Ok(exists)
    }

    #[instrument(skip(self), fields(op = "storage.postgres.is_email_exist"))]
    async fn is_email_exist(&self, email: &str) -> ProfileResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM profile WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_query_error(e, "is_email_exist"))?;

        debug!(exists, "checked email");
        Ok(exists)
    }

    #[instrument(skip(self), fields(op = "storage.postgres.update_email"))]
    async fn update_email(&self, id: ProfileId, new_email: &str) -> ProfileResult<Profile> {
        // An UPDATE matching nothing is not an error in SQL; the empty
        // RETURNING set is what signals the missing row.
        let query = format!(
            "UPDATE profile SET email = $1, updated_at = now() WHERE id = $2 RETURNING {PROFILE_COLUMNS}"
        );

        debug!("updating profile email");
        let row = sqlx::query(&query)
            .bind(new_email)
            .bind(id.into_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_write_error(e, new_email))?;

        let Some(row) = row else {
            return Err(ProfileError::profile_not_found(id));
        };
        let updated = row_to_profile(&row)?;
        info!("profile email updated");
        Ok(updated)
    }

    #[instrument(skip(self), fields(op = "storage.postgres.delete"))]
    async fn delete(&self, id: ProfileId) -> ProfileResult<()> {
        debug!("deleting profile");
        let result = sqlx::query("DELETE FROM profile WHERE id = $1")
            .bind(id.into_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_query_error(e, "delete"))?;

        if result.rows_affected() == 0 {
            return Err(ProfileError::profile_not_found(id));
        }

        info!("profile deleted");
        Ok(())
    }

    fn backend_label(&self) -> &'static str {
        "postgres"
    }

    async fn close(&self) {
        debug!("closing database pool");
        self.pool.close().await;
    }
}

fn row_to_profile(row: &PgRow) -> ProfileResult<Profile> {
    let id: Uuid = row
        .try_get("id")
        .map_err(|e| ProfileError::Persistence(format!("postgres decode id failed: {e}")))?;
    let email: String = row
        .try_get("email")
        .map_err(|e| ProfileError::Persistence(format!("postgres decode email failed: {e}")))?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(|e| {
        ProfileError::Persistence(format!("postgres decode created_at failed: {e}"))
    })?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(|e| {
        ProfileError::Persistence(format!("postgres decode updated_at failed: {e}"))
    })?;

    Ok(Profile {
        id: ProfileId::from(id),
        email,
        created_at,
        updated_at,
    })
}

fn map_write_error(err: sqlx::Error, email: &str) -> ProfileError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            info!(email, "unique constraint rejected email");
            return ProfileError::email_taken(email);
        }
    }
    error!(error = %err, "profile write failed");
    ProfileError::Persistence(err.to_string())
}

fn map_query_error(err: sqlx::Error, op: &str) -> ProfileError {
    error!(error = %err, op, "profile query failed");
    ProfileError::Persistence(format!("postgres {op} failed: {err}"))
}

#[cfg(test)]
mod tests {
    //! Run against a live database only when `PROFILE_TEST_DATABASE_URL` is set.

    use super::*;

    async fn test_store() -> Option<PostgresProfileStore> {
        let url = std::env::var("PROFILE_TEST_DATABASE_URL").ok()?;
        let store = PostgresProfileStore::connect(&url).await.unwrap();
        store.ensure_schema().await.unwrap();
        Some(store)
    }

    fn unique_email(tag: &str) -> String {
        format!("{tag}-{}@example.com", Uuid::new_v4().simple())
    }

    #[test]
    fn non_constraint_errors_become_persistence() {
        let err = map_query_error(sqlx::Error::PoolTimedOut, "delete");
        assert!(matches!(
            &err,
            ProfileError::Persistence(m) if m.starts_with("postgres delete failed")
        ));

        let err = map_write_error(sqlx::Error::PoolClosed, "a@example.com");
        assert!(matches!(err, ProfileError::Persistence(_)));
    }

    #[tokio::test]
    async fn insert_returns_server_timestamps() {
        let Some(store) = test_store().await else {
            return;
        };
        let email = unique_email("insert");
        let stored = store.insert(NewProfile::new(email.clone())).await.unwrap();

        assert!(stored.id.is_set());
        assert_eq!(stored.email, email);
        assert!(stored.updated_at >= stored.created_at);
        assert_eq!(store.get_by_id(stored.id).await.unwrap(), stored);

        store.delete(stored.id).await.unwrap();
    }

    #[tokio::test]
    async fn unique_constraint_surfaces_as_conflict() {
        let Some(store) = test_store().await else {
            return;
        };
        let email = unique_email("dup");
        let first = store.insert(NewProfile::new(email.clone())).await.unwrap();

        let err = store.insert(NewProfile::new(email)).await.unwrap_err();
        assert!(err.is_conflict());

        store.delete(first.id).await.unwrap();
    }

    #[tokio::test]
    async fn missing_rows_are_not_found() {
        let Some(store) = test_store().await else {
            return;
        };
        let id = ProfileId::new();

        assert!(store.get_by_id(id).await.unwrap_err().is_not_found());
        assert!(!store.is_exist(id).await.unwrap());
        assert!(store
            .update_email(id, "nobody@example.com")
            .await
            .unwrap_err()
            .is_not_found());
        assert!(store.delete(id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn update_bumps_updated_at() {
        let Some(store) = test_store().await else {
            return;
        };
        let stored = store
            .insert(NewProfile::new(unique_email("before")))
            .await
            .unwrap();
        let new_email = unique_email("after");

        let updated = store.update_email(stored.id, &new_email).await.unwrap();
        assert_eq!(updated.email, new_email);
        assert_eq!(updated.created_at, stored.created_at);
        assert!(updated.updated_at >= stored.updated_at);
        assert!(store.is_email_exist(&new_email).await.unwrap());

        store.delete(stored.id).await.unwrap();
    }
}
