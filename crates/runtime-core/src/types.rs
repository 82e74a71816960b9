//! Core type definitions shared by the storage and checkpoint crates

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Name of the trainable module that owns a set of snapshots
pub type ModuleName = String;

/// Training iteration counter
pub type Epoch = u64;

/// Metadata of one snapshot file found on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    /// Owning module
    pub module_name: ModuleName,

    /// Iteration encoded in the file name
    pub epoch: Epoch,

    /// File name relative to the checkpoint directory
    pub file_name: String,

    /// Full path of the snapshot file
    pub path: PathBuf,

    /// File size in bytes
    pub size_bytes: u64,

    /// Modification time reported by the storage medium
    pub modified: DateTime<Utc>,
}
