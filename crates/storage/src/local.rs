//! Local filesystem storage backend
//!
//! Provides async file I/O with atomic writes to prevent partial/corrupt files.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use runtime_core::{Error, Result};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::{ObjectMeta, StorageBackend};

/// Local filesystem storage backend
///
/// Stores data in one flat directory with support for:
/// - Atomic writes (write to a hidden .tmp file, fsync, rename, fsync dir)
/// - Removal of the temp file when any step of a write fails
/// - Prefix listing with modification times
#[derive(Debug, Clone)]
pub struct LocalStorage {
    /// Base path for all storage operations
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Directory to use as the storage root
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Get the base path
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve a relative path to an absolute path
    fn resolve_path(&self, path: &str) -> PathBuf {
        self.base_path.join(path)
    }

    /// Generate a unique temporary file path next to the target
    fn temp_path(&self, path: &str) -> PathBuf {
        let full_path = self.resolve_path(path);
        let temp_name = format!(
            ".{}.{}.tmp",
            full_path.file_name().unwrap_or_default().to_string_lossy(),
            Uuid::new_v4()
        );
        full_path.with_file_name(temp_name)
    }

    async fn write_temp(temp_path: &Path, data: &[u8]) -> Result<()> {
        let mut file = fs::File::create(temp_path).await.map_err(|e| {
            Error::storage(format!("Failed to create temp file {:?}", temp_path), e)
        })?;

        file.write_all(data)
            .await
            .map_err(|e| Error::storage("Failed to write data", e))?;

        file.sync_all()
            .await
            .map_err(|e| Error::storage("Failed to sync file", e))?;

        Ok(())
    }

    async fn sync_dir(dir: &Path) -> Result<()> {
        #[cfg(unix)]
        {
            let handle = fs::File::open(dir).await.map_err(|e| {
                Error::storage(format!("Failed to open directory {:?}", dir), e)
            })?;
            handle
                .sync_all()
                .await
                .map_err(|e| Error::storage(format!("Failed to sync directory {:?}", dir), e))?;
        }
        #[cfg(not(unix))]
        let _ = dir;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    #[instrument(skip(self), fields(backend = "local"))]
    async fn read(&self, path: &str) -> Result<Bytes> {
        let full_path = self.resolve_path(path);
        debug!(?full_path, "Reading file");

        match fs::read(&full_path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::StoragePathNotFound {
                path: path.to_string(),
            }),
            Err(e) => Err(Error::storage(format!("Failed to read {}", path), e)),
        }
    }

    #[instrument(skip(self, data), fields(backend = "local", size = data.len()))]
    async fn write(&self, path: &str, data: Bytes) -> Result<u64> {
        let full_path = self.resolve_path(path);
        let temp_path = self.temp_path(path);
        let size = data.len() as u64;

        debug!(?full_path, ?temp_path, size, "Writing file atomically");

        let result = async {
            Self::write_temp(&temp_path, &data).await?;

            fs::rename(&temp_path, &full_path).await.map_err(|e| {
                Error::storage(
                    format!("Failed to rename {:?} to {:?}", temp_path, full_path),
                    e,
                )
            })?;

            Self::sync_dir(&self.base_path).await
        }
        .await;

        if let Err(e) = result {
            // The rename either happened or it did not; only a leftover temp file needs removal.
            if let Err(cleanup) = fs::remove_file(&temp_path).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!(?temp_path, error = %cleanup, "Failed to remove temp file");
                }
            }
            return Err(e);
        }

        debug!(?full_path, size, "File written successfully");
        Ok(size)
    }

    #[instrument(skip(self), fields(backend = "local"))]
    async fn delete(&self, path: &str) -> Result<()> {
        let full_path = self.resolve_path(path);
        debug!(?full_path, "Deleting file");

        match fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::StoragePathNotFound {
                path: path.to_string(),
            }),
            Err(e) => Err(Error::storage(format!("Failed to delete {}", path), e)),
        }
    }

    #[instrument(skip(self), fields(backend = "local"))]
    async fn exists(&self, path: &str) -> Result<bool> {
        let full_path = self.resolve_path(path);
        Ok(fs::metadata(&full_path).await.is_ok())
    }

    #[instrument(skip(self), fields(backend = "local"))]
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>> {
        let mut results = Vec::new();

        let mut entries = match fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(results),
            Err(e) => {
                return Err(Error::storage(
                    format!("Failed to list {:?}", self.base_path),
                    e,
                ))
            }
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::storage(format!("Failed to list {:?}", self.base_path), e))?
        {
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };
            if !name.starts_with(prefix) {
                continue;
            }

            // Follows symlinks, so links to directories are dropped with directories.
            let entry_path = entry.path();
            let metadata = match fs::metadata(&entry_path).await {
                Ok(m) => m,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(Error::storage(format!("Failed to stat {:?}", entry_path), e))
                }
            };
            if !metadata.is_file() {
                continue;
            }

            let modified = metadata
                .modified()
                .map_err(|e| Error::storage(format!("No modification time for {:?}", entry_path), e))?;

            results.push(ObjectMeta {
                name,
                path: entry_path,
                size_bytes: metadata.len(),
                modified,
            });
        }

        debug!(count = results.len(), "Found files");
        Ok(results)
    }
}
