//! Tracing subscriber setup for training runs

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::{Error, Result};

/// Install the global subscriber.
///
/// Events go to `log_file` when given, and to stdout when `verbose` is set
/// or no file is configured. `RUST_LOG` overrides the level chosen by
/// `config.debug`. Panics are routed through `tracing::error!` as well.
pub fn init(log_file: Option<&Path>, config: &LoggingConfig) -> Result<()> {
    let default_level = if config.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    Error::storage(format!("Failed to open log file {}", path.display()), e)
                })?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };
    let stdout_layer = (config.verbose || log_file.is_none()).then(|| fmt::layer());

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .map_err(|e| Error::Internal {
            message: format!("Failed to install tracing subscriber: {}", e),
        })?;

    install_panic_hook();
    Ok(())
}

fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|l| l.to_string())
            .unwrap_or_default();
        tracing::error!(location = %location, "Unhandled panic: {}", info);
        default_hook(info);
    }));
}
