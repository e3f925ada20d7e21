// Record persistence collaborators

pub mod blob;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::data::record::Record;
use crate::processing::traits::RecordCallback;

pub use blob::{BlobError, BlobStore, DirBlobStore, MemoryBlobStore};
pub use memory::MemoryRecordStore;
pub use postgres::PostgresRecordStore;

/// Errors from record stores
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Invalid record document: {0}")]
    InvalidDocument(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Primary record storage. Implementations must be safe for concurrent use;
/// the processing engine shares one store across all tasks of a run.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert or replace the record keyed by its `id`
    async fn save(&self, record: &Record) -> Result<(), StoreError>;

    /// Delete the record matching `id`
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Fetch the record matching `id`
    async fn get(&self, id: &str) -> Result<Record, StoreError>;

    /// Pass a range of all records to `on_record`, in id order. Stops at the
    /// first callback error and returns it unchanged.
    async fn list(
        &self,
        offset: usize,
        limit: usize,
        on_record: &mut RecordCallback<'_>,
    ) -> Result<(), crate::error::ApiError>;

    /// Same as [`RecordStore::list`], restricted to records owned by `owner`
    async fn list_for_owner(
        &self,
        owner: &str,
        offset: usize,
        limit: usize,
        on_record: &mut RecordCallback<'_>,
    ) -> Result<(), crate::error::ApiError>;
}
