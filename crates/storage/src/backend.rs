//! Storage backend trait definition
//!
//! Defines the async interface the checkpoint store needs from its storage
//! medium.

use std::path::PathBuf;
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;
use runtime_core::Result;

/// A regular file found by [`StorageBackend::list`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Name relative to the storage root
    pub name: String,

    /// Full path on the medium
    pub path: PathBuf,

    /// Size in bytes
    pub size_bytes: u64,

    /// Modification time assigned by the medium
    pub modified: SystemTime,
}

/// Async trait for storage backends
///
/// Paths are file names relative to a single flat root directory.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Read data from the given path
    ///
    /// # Errors
    /// `StoragePathNotFound` if the file does not exist, `Storage` for any
    /// other I/O failure
    async fn read(&self, path: &str) -> Result<Bytes>;

    /// Write data to the given path
    ///
    /// The write is atomic: readers observe either the previous content or
    /// the complete new content, never a partial file. Nothing is left
    /// behind when the write fails.
    ///
    /// # Returns
    /// Number of bytes written
    async fn write(&self, path: &str, data: Bytes) -> Result<u64>;

    /// Delete data at the given path
    ///
    /// # Errors
    /// `StoragePathNotFound` if the file does not exist
    async fn delete(&self, path: &str) -> Result<()>;

    /// Check if a path exists
    async fn exists(&self, path: &str) -> Result<bool>;

    /// List regular files whose name starts with `prefix`
    ///
    /// Directories (and symlinks resolving to directories) are skipped.
    /// The order of the returned entries is unspecified.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>>;
}
