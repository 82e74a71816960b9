//! Checkpoint store: bounded-retention snapshots in a flat directory
//!
//! The store keeps no state between calls. Every operation lists the
//! directory again, so a store constructed after a restart sees everything
//! written before it.
//!
//! Concurrency: one writer per module name is a precondition. `save` runs
//! list, evict, write in sequence and `restore` runs list, read; concurrent
//! callers on the same module race between those steps. Enable
//! `CheckpointConfig::lock_files` to turn such overlap into a
//! `ModuleLocked` error instead.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use runtime_core::{CheckpointConfig, Epoch, Error, Result, SnapshotInfo};
use storage::{LocalStorage, StorageBackend};
use tracing::{debug, info, instrument};

use crate::format;
use crate::lock::ModuleLock;
use crate::naming::{
    parse_snapshot_epoch, snapshot_file_name, snapshot_prefix, sort_newest_first,
    validate_module_name,
};
use crate::state::{Module, Stateful, TrainingState};

/// Checkpoint store over one directory
pub struct CheckpointStore {
    /// Configuration
    config: CheckpointConfig,

    /// Storage medium rooted at `config.path`
    storage: Arc<dyn StorageBackend>,
}

impl CheckpointStore {
    /// Open a store on the local filesystem, creating the directory if needed
    pub async fn open(config: CheckpointConfig) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.path)
            .await
            .map_err(|e| {
                Error::storage(
                    format!("Failed to create checkpoint directory {:?}", config.path),
                    e,
                )
            })?;

        let storage = Arc::new(LocalStorage::new(&config.path));
        Ok(Self { config, storage })
    }

    /// Use an existing backend rooted at `config.path`
    pub fn with_backend(config: CheckpointConfig, storage: Arc<dyn StorageBackend>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, storage })
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    pub fn retain(&self) -> usize {
        self.config.retain
    }

    /// Snapshots of `module`, newest first.
    ///
    /// Ordered by modification time; snapshots with identical times are
    /// ordered by iteration, highest first.
    #[instrument(skip(self))]
    pub async fn list_snapshots(&self, module: &str) -> Result<Vec<SnapshotInfo>> {
        validate_module_name(module)?;

        let objects = self.storage.list(&snapshot_prefix(module)).await?;
        let mut snapshots: Vec<SnapshotInfo> = objects
            .into_iter()
            .filter_map(|object| {
                let epoch = parse_snapshot_epoch(module, &object.name)?;
                Some(SnapshotInfo {
                    module_name: module.to_string(),
                    epoch,
                    file_name: object.name,
                    path: object.path,
                    size_bytes: object.size_bytes,
                    modified: DateTime::<Utc>::from(object.modified),
                })
            })
            .collect();

        sort_newest_first(&mut snapshots);
        debug!(count = snapshots.len(), "Listed snapshots");
        Ok(snapshots)
    }

    /// Newest snapshot of `module`, without reading it
    pub async fn latest(&self, module: &str) -> Result<Option<SnapshotInfo>> {
        Ok(self.list_snapshots(module).await?.into_iter().next())
    }

    /// Persist `state` as the snapshot of `module` at `state.epoch`.
    ///
    /// Oldest snapshots are evicted first so that, once the new file is
    /// written, at most `retain` remain. Saving an epoch that already has a
    /// snapshot replaces that file in place and evicts nothing on its behalf.
    #[instrument(skip(self, state), fields(epoch = state.epoch))]
    pub async fn save(&self, module: &str, state: &TrainingState) -> Result<PathBuf> {
        validate_module_name(module)?;
        let _lock = self.lock(module)?;

        let file_name = snapshot_file_name(module, state.epoch);
        let candidates: Vec<SnapshotInfo> = self
            .list_snapshots(module)
            .await?
            .into_iter()
            .filter(|s| s.file_name != file_name)
            .collect();

        if candidates.len() >= self.config.retain {
            let keep = self.config.retain - 1;
            for snapshot in &candidates[keep..] {
                self.evict(snapshot).await?;
            }
        }

        let data = format::encode(state, Utc::now())?;
        let size_bytes = self.storage.write(&file_name, data).await?;

        let path = self.config.path.join(&file_name);
        info!(
            module = %module,
            epoch = state.epoch,
            size_bytes,
            path = %path.display(),
            "Checkpoint saved"
        );
        Ok(path)
    }

    /// Load the newest snapshot of `module`.
    ///
    /// Returns `None` when the module has no snapshots. Never falls back to
    /// an older snapshot when the newest cannot be read.
    #[instrument(skip(self))]
    pub async fn restore(&self, module: &str) -> Result<Option<(Epoch, TrainingState)>> {
        Ok(self
            .restore_newest(module)
            .await?
            .map(|(_, state)| (state.epoch, state)))
    }

    /// Snapshot live training objects under `module.name()`
    pub async fn make_checkpoint(
        &self,
        module: &dyn Module,
        optimizer: &dyn Stateful,
        epoch: Epoch,
        scheduler: Option<&dyn Stateful>,
    ) -> Result<PathBuf> {
        let state = TrainingState::capture(module, optimizer, epoch, scheduler)?;
        self.save(module.name(), &state).await
    }

    /// Restore the newest snapshot of `module.name()` into live objects and
    /// return the epoch to resume from.
    ///
    /// When a scheduler is passed, the snapshot must carry scheduler state;
    /// otherwise nothing is loaded and the snapshot is reported as corrupted.
    pub async fn restore_into(
        &self,
        module: &mut dyn Module,
        optimizer: &mut dyn Stateful,
        scheduler: Option<&mut dyn Stateful>,
    ) -> Result<Option<Epoch>> {
        let name = module.name().to_string();
        let Some((snapshot, state)) = self.restore_newest(&name).await? else {
            return Ok(None);
        };

        let scheduler = match (scheduler, &state.scheduler) {
            (Some(live), Some(saved)) => Some((live, saved)),
            (Some(_), None) => {
                return Err(Error::CheckpointCorrupted {
                    path: snapshot.path.display().to_string(),
                    reason: "snapshot has no scheduler state".to_string(),
                })
            }
            (None, _) => None,
        };

        module.load_state_dict(&state.state_dict)?;
        optimizer.load_state_dict(&state.optimizer)?;
        if let Some((live, saved)) = scheduler {
            live.load_state_dict(saved)?;
        }

        Ok(Some(state.epoch))
    }

    /// Read and decode the head of the listing, with the snapshot it came from
    async fn restore_newest(&self, module: &str) -> Result<Option<(SnapshotInfo, TrainingState)>> {
        validate_module_name(module)?;
        let _lock = self.lock(module)?;

        let Some(newest) = self.list_snapshots(module).await?.into_iter().next() else {
            debug!(module = %module, "No checkpoint to restore");
            return Ok(None);
        };

        let data = self.storage.read(&newest.file_name).await?;
        let state = format::decode(&data, &newest.path.display().to_string())?;

        info!(
            module = %module,
            epoch = state.epoch,
            path = %newest.path.display(),
            "Checkpoint restored"
        );
        Ok(Some((newest, state)))
    }

    async fn evict(&self, snapshot: &SnapshotInfo) -> Result<()> {
        match self.storage.delete(&snapshot.file_name).await {
            Ok(()) => {
                debug!(epoch = snapshot.epoch, file = %snapshot.file_name, "Evicted snapshot");
                Ok(())
            }
            // Already gone is the outcome eviction wants.
            Err(Error::StoragePathNotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn lock(&self, module: &str) -> Result<Option<ModuleLock>> {
        if !self.config.lock_files {
            return Ok(None);
        }
        ModuleLock::try_acquire(&self.config.path, module).map(Some)
    }
}
