//! Runtime configuration types

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Main runtime configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Checkpoint settings
    pub checkpoint: CheckpointConfig,

    /// Run directory settings
    pub run: RunConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl RuntimeConfig {
    /// Parse a configuration from JSON, filling missing fields with defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::storage(format!("Failed to read config {}", path.display()), e)
        })?;
        Self::from_json(&json)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        self.checkpoint.validate()
    }
}

/// Checkpoint store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    /// Directory holding the snapshots of every module
    pub path: PathBuf,

    /// Maximum number of snapshots kept per module name
    pub retain: usize,

    /// Hold an advisory lock file per module during save/restore
    pub lock_files: bool,
}

impl CheckpointConfig {
    /// Create a config for the given directory and retention bound
    pub fn new(path: impl Into<PathBuf>, retain: usize) -> Self {
        Self {
            path: path.into(),
            retain,
            ..Default::default()
        }
    }

    /// Enable or disable per-module lock files
    pub fn lock_files(mut self, enabled: bool) -> Self {
        self.lock_files = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.retain == 0 {
            return Err(Error::InvalidConfig {
                message: "checkpoint.retain must be at least 1".to_string(),
            });
        }
        if self.path.as_os_str().is_empty() {
            return Err(Error::InvalidConfig {
                message: "checkpoint.path must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./checkpoints"),
            retain: 5,
            lock_files: false,
        }
    }
}

/// Output directory configuration for a training run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Root output directory
    pub out_dir: PathBuf,

    /// Experiment name appended to fresh run directories
    pub exp_name: String,

    /// Log results every N epochs
    pub log_freq: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("./runs"),
            exp_name: String::new(),
            log_freq: 1,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log at debug level instead of info
    pub debug: bool,

    /// Mirror the log file to stdout
    pub verbose: bool,

    /// Log file name inside the run directory
    pub file_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            debug: false,
            verbose: false,
            file_name: "log".to_string(),
        }
    }
}
