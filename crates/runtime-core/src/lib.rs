//! Runtime Core - Foundation for checkpoint persistence
//!
//! Provides the shared error type, configuration, snapshot metadata,
//! run-directory bootstrap and logging setup used by the storage and
//! checkpoint crates.

pub mod config;
pub mod error;
pub mod layout;
pub mod logging;
pub mod types;

pub use config::{CheckpointConfig, LoggingConfig, RunConfig, RuntimeConfig};
pub use error::{Error, Result};
pub use layout::RunLayout;
pub use types::*;
