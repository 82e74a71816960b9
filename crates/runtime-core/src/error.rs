//! Error types for the checkpoint runtime

use thiserror::Error;

/// Result type alias using the runtime Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for checkpoint persistence
#[derive(Error, Debug)]
pub enum Error {
    // Checkpoint errors
    #[error("Checkpoint corrupted: {path} - {reason}")]
    CheckpointCorrupted { path: String, reason: String },

    #[error("Incompatible checkpoint format in {path}: version {found}, expected {expected}")]
    IncompatibleVersion {
        path: String,
        found: u32,
        expected: u32,
    },

    #[error("Invalid module name {name:?}: {reason}")]
    InvalidModuleName { name: String, reason: String },

    #[error("Module {module} is locked by another writer ({lock_path})")]
    ModuleLocked { module: String, lock_path: String },

    // Storage errors
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage path not found: {path}")]
    StoragePathNotFound { path: String },

    // Configuration errors
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Build a storage error that keeps the underlying I/O error as its source
    pub fn storage(message: impl Into<String>, source: std::io::Error) -> Self {
        Error::Storage {
            message: message.into(),
            source,
        }
    }

    /// Returns true if this error came from the storage medium
    /// (permissions, full disk, a file vanishing mid-operation, lock contention)
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Error::Io(_)
                | Error::Storage { .. }
                | Error::StoragePathNotFound { .. }
                | Error::ModuleLocked { .. }
        )
    }

    /// Returns true if a snapshot was read but could not be decoded
    pub fn is_deserialization(&self) -> bool {
        matches!(
            self,
            Error::CheckpointCorrupted { .. } | Error::IncompatibleVersion { .. }
        )
    }

    /// Returns true if retrying the same call cannot succeed
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::CheckpointCorrupted { .. }
                | Error::IncompatibleVersion { .. }
                | Error::InvalidConfig { .. }
                | Error::InvalidModuleName { .. }
                | Error::Internal { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
