//! Checkpoint management for iterative training
//!
//! Persists model, optimizer and scheduler state with bounded retention per
//! module, and restores the newest snapshot after a restart.

pub mod format;
pub mod lock;
pub mod manager;
pub mod naming;
pub mod state;

pub use format::{CheckpointHeader, CHECKPOINT_MAGIC, CHECKPOINT_VERSION};
pub use lock::ModuleLock;
pub use manager::CheckpointStore;
pub use naming::{snapshot_file_name, SNAPSHOT_EXTENSION};
pub use state::{Module, Stateful, TrainingState};
