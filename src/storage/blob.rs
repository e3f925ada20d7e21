// Storage for externalized `data` field content, one blob per record id

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Invalid blob id: {0}")]
    InvalidId(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn save(&self, id: &str, content: &str) -> Result<(), BlobError>;

    async fn get(&self, id: &str) -> Result<String, BlobError>;

    async fn delete(&self, id: &str) -> Result<(), BlobError>;
}

/// Blob store held in process memory
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn save(&self, id: &str, content: &str) -> Result<(), BlobError> {
        self.blobs
            .write()
            .await
            .insert(id.to_string(), content.to_string());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<String, BlobError> {
        self.blobs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(id.to_string()))
    }

    async fn delete(&self, id: &str) -> Result<(), BlobError> {
        match self.blobs.write().await.remove(id) {
            Some(_) => Ok(()),
            None => Err(BlobError::NotFound(id.to_string())),
        }
    }
}

/// Blob store keeping one file per id under a root directory
pub struct DirBlobStore {
    root: PathBuf,
}

impl DirBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ids become file names; anything that could leave the root is refused.
    fn path_for(&self, id: &str) -> Result<PathBuf, BlobError> {
        if id.is_empty()
            || id == "."
            || id == ".."
            || id.contains(['/', '\\', '\0'])
        {
            return Err(BlobError::InvalidId(id.to_string()));
        }
        Ok(self.root.join(id))
    }
}

fn not_found_or_io(id: &str, err: std::io::Error) -> BlobError {
    match err.kind() {
        std::io::ErrorKind::NotFound => BlobError::NotFound(id.to_string()),
        _ => BlobError::Io(err),
    }
}

#[async_trait]
impl BlobStore for DirBlobStore {
    async fn save(&self, id: &str, content: &str) -> Result<(), BlobError> {
        let path = self.path_for(id)?;
        tokio::fs::write(&path, content.as_bytes()).await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<String, BlobError> {
        let path = self.path_for(id)?;
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| not_found_or_io(id, e))?;
        if metadata.is_dir() {
            return Ok(String::new());
        }

        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| not_found_or_io(id, e))
    }

    async fn delete(&self, id: &str) -> Result<(), BlobError> {
        let path = self.path_for(id)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| not_found_or_io(id, e))
    }
}
