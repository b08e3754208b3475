//! Blob storage for file attachments.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use crate::error::{Result, StoreError};

/// Reference to an uploaded blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobHandle {
    pub path: String,
    pub size: usize,
}

/// Hosted object store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, path: &str, bytes: &[u8]) -> Result<BlobHandle>;

    async fn download_url(&self, handle: &BlobHandle) -> Result<String>;
}

/// Verify that a relative blob path stays inside the base directory.
fn resolve_within(base: &Path, relative: &str) -> Result<PathBuf> {
    if relative.is_empty() || relative.contains('\\') {
        return Err(StoreError::InvalidPath(relative.to_string()));
    }
    let mut resolved = base.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(c) => resolved.push(c),
            _ => return Err(StoreError::InvalidPath(relative.to_string())),
        }
    }
    Ok(resolved)
}

/// Blob store on the local filesystem.
///
/// Blobs are written below `base_path` under their logical path and never
/// overwritten. Download URLs are `base_url` joined with the logical path.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    base_path: PathBuf,
    base_url: String,
    max_size: usize,
}

impl FsBlobStore {
    pub async fn new(base_path: PathBuf, base_url: String, max_size: usize) -> Result<Self> {
        fs::create_dir_all(&base_path).await?;

        info!(path = %base_path.display(), url = %base_url, "Blob store initialized");

        Ok(Self {
            base_path,
            base_url,
            max_size,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub async fn read(&self, handle: &BlobHandle) -> Result<Vec<u8>> {
        let path = resolve_within(&self.base_path, &handle.path)?;
        if !fs::try_exists(&path).await? {
            return Err(StoreError::NotFound(handle.path.clone()));
        }
        Ok(fs::read(&path).await?)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload(&self, path: &str, bytes: &[u8]) -> Result<BlobHandle> {
        if bytes.len() > self.max_size {
            return Err(StoreError::BlobTooLarge {
                size: bytes.len(),
                max: self.max_size,
            });
        }

        let target = resolve_within(&self.base_path, path)?;
        if fs::try_exists(&target).await? {
            return Err(StoreError::Conflict(path.to_string()));
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, bytes).await?;

        debug!(path, size = bytes.len(), "Stored blob");
        Ok(BlobHandle {
            path: path.to_string(),
            size: bytes.len(),
        })
    }

    async fn download_url(&self, handle: &BlobHandle) -> Result<String> {
        let target = resolve_within(&self.base_path, &handle.path)?;
        if !fs::try_exists(&target).await? {
            return Err(StoreError::NotFound(handle.path.clone()));
        }
        Ok(format!("{}/{}", self.base_url.trim_end_matches('/'), handle.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_store() -> (FsBlobStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(
            dir.path().to_path_buf(),
            "https://files.example/".to_string(),
            1024,
        )
        .await
        .unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn upload_then_resolve_url() {
        let (store, _dir) = test_store().await;
        let handle = store
            .upload("chat_files/a_b/1_notes.txt", b"hello")
            .await
            .unwrap();

        assert_eq!(handle.size, 5);
        assert_eq!(
            store.download_url(&handle).await.unwrap(),
            "https://files.example/chat_files/a_b/1_notes.txt"
        );
        assert_eq!(store.read(&handle).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn uploads_never_overwrite() {
        let (store, _dir) = test_store().await;
        store.upload("x/y.bin", b"1").await.unwrap();
        let err = store.upload("x/y.bin", b"2").await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn traversal_rejected() {
        let (store, _dir) = test_store().await;
        for bad in ["../escape", "/abs/path", "a/../../b", "a\\b", ""] {
            assert!(
                matches!(store.upload(bad, b"x").await, Err(StoreError::InvalidPath(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn oversized_blob_rejected() {
        let (store, _dir) = test_store().await;
        let err = store.upload("big.bin", &[0u8; 2048]).await.unwrap_err();
        assert!(matches!(err, StoreError::BlobTooLarge { size: 2048, max: 1024 }));
    }

    #[tokio::test]
    async fn unknown_handle_has_no_url() {
        let (store, _dir) = test_store().await;
        let handle = BlobHandle {
            path: "missing.bin".into(),
            size: 0,
        };
        assert!(matches!(
            store.download_url(&handle).await,
            Err(StoreError::NotFound(_))
        ));
    }
}
