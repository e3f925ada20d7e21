// Concrete record steps used by the transform chains and fan-out sinks

use async_trait::async_trait;
use std::sync::Arc;

use crate::auth::PasswordHasher;
use crate::data::record::{Record, FIELD_DATA, FIELD_PASSWORD};
use crate::error::ApiError;
use crate::processing::traits::RecordStep;
use crate::storage::blob::{BlobError, BlobStore};
use crate::storage::RecordStore;

/// Persist the `data` field to the blob store under the record id, then drop
/// it from the record. A record without `data` stores an empty blob; a
/// `data` value that is not a string is refused before anything is written.
pub struct ExternalizeData {
    blobs: Arc<dyn BlobStore>,
}

impl ExternalizeData {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }
}

#[async_trait]
impl RecordStep for ExternalizeData {
    fn name(&self) -> &'static str {
        "ExternalizeData"
    }

    async fn apply(&self, record: Record) -> Result<Record, ApiError> {
        let id = record.id();
        if id.is_empty() {
            return Err(ApiError::bad_input("record has no id"));
        }
        let content = record.string_field(FIELD_DATA)?.unwrap_or_default();
        let stripped = record.without_field(FIELD_DATA)?;

        self.blobs.save(&id, &content).await?;
        Ok(stripped)
    }
}

/// Replace the `password` field with its one-way hash. Records without a
/// password pass through unchanged.
pub struct HashSecret {
    hasher: Arc<dyn PasswordHasher>,
}

impl HashSecret {
    pub fn new(hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { hasher }
    }
}

#[async_trait]
impl RecordStep for HashSecret {
    fn name(&self) -> &'static str {
        "HashSecret"
    }

    async fn apply(&self, record: Record) -> Result<Record, ApiError> {
        let Some(secret) = record.password() else {
            return Ok(record);
        };

        // bcrypt is deliberately slow; keep it off the async workers
        let hasher = self.hasher.clone();
        let hashed = tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|e| ApiError::internal(format!("hash task failed: {}", e)))??;

        record.with_field(FIELD_PASSWORD, &hashed)
    }
}

/// Set the externalized blob back onto the `data` field. A missing or empty
/// blob leaves the record as it is.
pub struct MergeData {
    blobs: Arc<dyn BlobStore>,
}

impl MergeData {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }
}

#[async_trait]
impl RecordStep for MergeData {
    fn name(&self) -> &'static str {
        "MergeData"
    }

    async fn apply(&self, record: Record) -> Result<Record, ApiError> {
        let content = match self.blobs.get(&record.id()).await {
            Ok(content) => content,
            Err(BlobError::NotFound(_)) => return Ok(record),
            Err(err) => return Err(err.into()),
        };

        if content.is_empty() {
            return Ok(record);
        }
        record.with_field(FIELD_DATA, &content)
    }
}

/// Fan-out sink writing each transformed record to the record store.
pub struct SaveToStore {
    store: Arc<dyn RecordStore>,
}

impl SaveToStore {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RecordStep for SaveToStore {
    fn name(&self) -> &'static str {
        "SaveToStore"
    }

    async fn apply(&self, record: Record) -> Result<Record, ApiError> {
        self.store.save(&record).await?;
        Ok(record)
    }
}

/// Fan-out sink for read-only runs.
pub struct PassThrough;

#[async_trait]
impl RecordStep for PassThrough {
    fn name(&self) -> &'static str {
        "PassThrough"
    }

    async fn apply(&self, record: Record) -> Result<Record, ApiError> {
        Ok(record)
    }
}
