//! Training state payload and the traits collaborators implement to be
//! checkpointed.

use bytes::Bytes;
use runtime_core::{Epoch, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Anything whose internal state can be exported and re-imported.
///
/// Optimizers and learning-rate schedulers implement this directly;
/// trainable modules implement [`Module`] on top of it.
pub trait Stateful {
    /// Serialize the full state
    fn state_dict(&self) -> Result<Bytes>;

    /// Replace the state with a previously exported one
    fn load_state_dict(&mut self, state: &[u8]) -> Result<()>;
}

/// A trainable module. Its name selects the snapshot files it owns.
pub trait Module: Stateful {
    fn name(&self) -> &str;
}

/// Everything persisted in one snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingState {
    /// Model parameters
    pub state_dict: Bytes,

    /// Iteration the snapshot was taken at
    pub epoch: Epoch,

    /// Optimizer state
    pub optimizer: Bytes,

    /// Scheduler state, when a scheduler is in use
    pub scheduler: Option<Bytes>,

    /// Free-form annotations (loss, git revision, ...)
    pub metadata: BTreeMap<String, String>,
}

impl TrainingState {
    pub fn new(epoch: Epoch, state_dict: Bytes, optimizer: Bytes) -> Self {
        Self {
            state_dict,
            epoch,
            optimizer,
            scheduler: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_scheduler(mut self, scheduler: Bytes) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Export the state of live training objects
    pub fn capture(
        module: &dyn Module,
        optimizer: &dyn Stateful,
        epoch: Epoch,
        scheduler: Option<&dyn Stateful>,
    ) -> Result<Self> {
        Ok(Self {
            state_dict: module.state_dict()?,
            epoch,
            optimizer: optimizer.state_dict()?,
            scheduler: scheduler.map(|s| s.state_dict()).transpose()?,
            metadata: BTreeMap::new(),
        })
    }
}
