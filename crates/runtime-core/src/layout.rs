//! Run directory bootstrap
//!
//! A run writes into `<out_dir>/checkpoints/`. If that directory already
//! exists the run resumes in place; otherwise a fresh timestamped run
//! directory is created under `out_dir`.

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::{Error, Result};

/// Name of the checkpoint directory inside a run directory
pub const CHECKPOINT_DIR: &str = "checkpoints";

/// Name of the best-model directory inside the checkpoint directory
pub const BEST_DIR: &str = "best";

/// Timestamp format of fresh run directories
const RUN_DIR_FORMAT: &str = "%d_%m_%Y_%H_%M_%S";

/// Resolved directories of a training run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    /// Run output directory
    pub out_dir: PathBuf,

    /// Directory the checkpoint store writes to
    pub checkpoint_dir: PathBuf,

    /// Directory reserved for best-model snapshots
    pub best_dir: PathBuf,

    /// True when an existing run directory was picked up
    pub resumed: bool,
}

impl RunLayout {
    /// Resolve or create the run directories
    pub fn prepare(out_dir: impl AsRef<Path>, exp_name: &str, now: DateTime<Local>) -> Result<Self> {
        let out_dir = out_dir.as_ref();
        let existing = out_dir.join(CHECKPOINT_DIR);

        if existing.is_dir() {
            debug!(out_dir = %out_dir.display(), "Resuming existing run directory");
            return Ok(Self::at(out_dir.to_path_buf(), true));
        }

        let mut run_name = now.format(RUN_DIR_FORMAT).to_string();
        if !exp_name.is_empty() {
            run_name.push('-');
            run_name.push_str(exp_name);
        }

        let layout = Self::at(out_dir.join(run_name), false);
        std::fs::create_dir_all(&layout.best_dir).map_err(|e| {
            Error::storage(
                format!("Failed to create run directory {}", layout.out_dir.display()),
                e,
            )
        })?;

        debug!(out_dir = %layout.out_dir.display(), "Created run directory");
        Ok(layout)
    }

    fn at(out_dir: PathBuf, resumed: bool) -> Self {
        let checkpoint_dir = out_dir.join(CHECKPOINT_DIR);
        let best_dir = checkpoint_dir.join(BEST_DIR);
        Self {
            out_dir,
            checkpoint_dir,
            best_dir,
            resumed,
        }
    }

    /// Path of the run log file
    pub fn log_file(&self, file_name: &str) -> PathBuf {
        self.out_dir.join(file_name)
    }
}
