// Ordered record transforms applied around the record store

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

use crate::auth::PasswordHasher;
use crate::data::record::Record;
use crate::error::ApiError;
use crate::processing::steps::{ExternalizeData, HashSecret, MergeData};
use crate::processing::traits::RecordStep;
use crate::storage::blob::BlobStore;

/// Short-circuiting sequence of steps. The first failing step aborts the
/// chain and its error is returned as is.
///
/// There is no rollback across steps: when the ingest chain externalizes a
/// blob and then fails to hash the secret, the blob stays written and the
/// record never reaches the store. Cleaning that up is the caller's job.
#[derive(Clone)]
pub struct TransformChain {
    name: &'static str,
    steps: Vec<Arc<dyn RecordStep>>,
}

impl TransformChain {
    pub fn new(name: &'static str, steps: Vec<Arc<dyn RecordStep>>) -> Self {
        Self { name, steps }
    }

    /// Write path: move `data` out to the blob store, then hash `password`.
    /// Both happen before the record can reach the store.
    pub fn ingest(blobs: Arc<dyn BlobStore>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self::new(
            "ingest",
            vec![
                Arc::new(ExternalizeData::new(blobs)),
                Arc::new(HashSecret::new(hasher)),
            ],
        )
    }

    /// Read path: put the externalized `data` back onto the record.
    pub fn retrieve(blobs: Arc<dyn BlobStore>) -> Self {
        Self::new("retrieve", vec![Arc::new(MergeData::new(blobs))])
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub async fn apply(&self, record: Record) -> Result<Record, ApiError> {
        if record.is_empty() {
            return Ok(record);
        }

        let mut record = record;
        for step in &self.steps {
            let started = Instant::now();
            record = match step.apply(record).await {
                Ok(next) => next,
                Err(err) => {
                    tracing::debug!(
                        "Chain {}: step {} failed in {:?}: {}",
                        self.name,
                        step.name(),
                        started.elapsed(),
                        err
                    );
                    return Err(err);
                }
            };
            tracing::trace!(
                "Chain {}: step {} completed in {:?}",
                self.name,
                step.name(),
                started.elapsed()
            );
        }
        Ok(record)
    }
}

// A chain is itself a step, so it can be handed to the fan-out runner.
#[async_trait]
impl RecordStep for TransformChain {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn apply(&self, record: Record) -> Result<Record, ApiError> {
        TransformChain::apply(self, record).await
    }
}
