//! profiled: gRPC front end for profile storage.
//!
//! The transport decodes requests, validates email syntax and identifiers,
//! and delegates to [`profile_core::ProfileService`].

#![deny(unsafe_code)]

pub mod config;
pub mod grpc;
pub mod pb;
pub mod telemetry;

use config::{DatabaseConfig, StorageKind};
use profile_core::{InMemoryProfileStore, PostgresProfileStore, ProfileService, ProfileStore};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Shared per-process state: the service over the configured store.
#[derive(Clone)]
pub struct ServiceState {
    pub profiles: ProfileService<dyn ProfileStore>,
}

impl ServiceState {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self {
            profiles: ProfileService::new(store),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryProfileStore::new()))
    }

    /// Connect the configured backend.
    pub async fn bootstrap(
        storage: StorageKind,
        database: &DatabaseConfig,
    ) -> Result<Self, ServiceError> {
        match storage {
            StorageKind::Memory => {
                info!("using in-memory profile storage");
                Ok(Self::in_memory())
            }
            StorageKind::Postgres => {
                info!(
                    host = %database.host,
                    port = database.port,
                    dbname = %database.dbname,
                    "connecting to database"
                );
                let store = PostgresProfileStore::connect_with_options(
                    &database.url(),
                    database.max_connections,
                    database.connect_timeout_secs,
                )
                .await?;
                if database.ensure_schema {
                    store.ensure_schema().await?;
                }
                Ok(Self::new(Arc::new(store)))
            }
        }
    }

    pub fn storage_label(&self) -> &'static str {
        self.profiles.store().backend_label()
    }

    pub async fn shutdown(&self) {
        self.profiles.store().close().await;
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("telemetry error: {0}")]
    Telemetry(String),

    #[error(transparent)]
    Core(#[from] profile_core::ProfileError),

    #[error("grpc transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("grpc reflection error: {0}")]
    Reflection(#[from] tonic_reflection::server::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
