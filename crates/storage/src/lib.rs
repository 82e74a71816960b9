//! Storage - the filesystem collaborator of the checkpoint store
//!
//! Provides async file operations over a single flat directory:
//! - atomic writes (temp file, fsync, rename)
//! - prefix listing of regular files with size and modification time
//! - read and delete
//!
//! # Example
//!
//! ```no_run
//! use storage::{StorageBackend, LocalStorage};
//! use bytes::Bytes;
//!
//! # async fn example() -> runtime_core::Result<()> {
//! let storage = LocalStorage::new("/tmp/checkpoints");
//! storage.write("model_epoch_1.ckpt", Bytes::from(vec![1, 2, 3])).await?;
//! let data = storage.read("model_epoch_1.ckpt").await?;
//! # Ok(())
//! # }
//! ```

mod backend;
mod local;

pub use backend::{ObjectMeta, StorageBackend};
pub use local::LocalStorage;
