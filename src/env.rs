// Collaborators shared by every operation, constructed once at startup

use anyhow::{anyhow, Context};
use std::sync::Arc;

use crate::auth::{BcryptHasher, PasswordHasher};
use crate::config::AppConfig;
use crate::processing::FanOutRunner;
use crate::storage::{
    BlobStore, DirBlobStore, MemoryBlobStore, MemoryRecordStore, PostgresRecordStore, RecordStore,
};

/// Dependency-injection context handed to the execution layer.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn RecordStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub admin_password: String,
    pub runner: FanOutRunner,
    /// Default and upper bound of list page sizes
    pub list_max_count: i64,
    pub require_admin_for_add_users: bool,
}

impl Services {
    /// Build the production collaborators: Postgres when a database URL is
    /// configured, otherwise the in-memory store, and blobs on disk.
    ///
    /// Expects secrets to be resolved already (see [`AppConfig::resolve_secrets`]).
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let admin_password = config
            .security
            .admin_password
            .clone()
            .ok_or_else(|| anyhow!("admin password is not configured"))?;

        let store: Arc<dyn RecordStore> = match &config.server.database_url {
            Some(url) => Arc::new(
                PostgresRecordStore::connect(url, config.server.max_connections)
                    .await
                    .context("failed to connect record store")?,
            ),
            None => {
                tracing::warn!("DATABASE_URL not set, records are kept in memory");
                Arc::new(MemoryRecordStore::new())
            }
        };

        let data_dir = config.data_dir();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;
        tracing::info!("Blob directory: {}", data_dir.display());

        Ok(Self {
            store,
            blobs: Arc::new(DirBlobStore::new(data_dir)),
            hasher: Arc::new(BcryptHasher::new(config.processing.hash_cost)),
            admin_password,
            runner: FanOutRunner::with_max_concurrency(config.processing.max_concurrency),
            list_max_count: config.listing.max_count,
            require_admin_for_add_users: config.security.require_admin_for_add_users,
        })
    }

    /// Process-local collaborators only; nothing touches disk or network.
    pub fn in_memory(config: &AppConfig) -> Self {
        Self {
            store: Arc::new(MemoryRecordStore::new()),
            blobs: Arc::new(MemoryBlobStore::new()),
            hasher: Arc::new(BcryptHasher::new(config.processing.hash_cost)),
            admin_password: config.security.admin_password.clone().unwrap_or_default(),
            runner: FanOutRunner::with_max_concurrency(config.processing.max_concurrency),
            list_max_count: config.listing.max_count,
            require_admin_for_add_users: config.security.require_admin_for_add_users,
        }
    }
}
