//! `ckpt` command implementation
//!
//! ```text
//! ckpt list <dir> <module>    snapshots of a module, newest first
//! ckpt inspect <file>         header and payload summary of one snapshot
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use checkpoint::{format, CheckpointStore};
use runtime_core::CheckpointConfig;
use storage::LocalStorage;

pub const USAGE: &str = "usage:\n  ckpt list <dir> <module>\n  ckpt inspect <file>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List { dir: PathBuf, module: String },
    Inspect { file: PathBuf },
}

impl Command {
    /// Parse arguments, excluding the program name
    pub fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let args: Vec<String> = args.into_iter().collect();
        match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
            ["list", dir, module] => Ok(Command::List {
                dir: PathBuf::from(dir),
                module: module.to_string(),
            }),
            ["inspect", file] => Ok(Command::Inspect {
                file: PathBuf::from(file),
            }),
            _ => bail!("invalid arguments {:?}\n{}", args, USAGE),
        }
    }
}

/// Execute a command, writing its report to `out`
pub async fn run(command: &Command, out: &mut impl Write) -> Result<()> {
    match command {
        Command::List { dir, module } => {
            // Listing never creates the directory, so bypass `CheckpointStore::open`.
            let config = CheckpointConfig::new(dir, 1);
            let backend = Arc::new(LocalStorage::new(dir));
            let store = CheckpointStore::with_backend(config, backend)?;

            let snapshots = store.list_snapshots(module).await?;
            if snapshots.is_empty() {
                writeln!(out, "no snapshots for {} in {}", module, dir.display())?;
            }
            for snapshot in snapshots {
                writeln!(
                    out,
                    "{:>8}  {:>12}  {}  {}",
                    snapshot.epoch,
                    snapshot.size_bytes,
                    snapshot.modified.format("%Y-%m-%d %H:%M:%S%.3f"),
                    snapshot.file_name
                )?;
            }
        }
        Command::Inspect { file } => {
            let data = tokio::fs::read(file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let origin = file.display().to_string();

            let header = format::read_header(&data, &origin)?;
            writeln!(out, "version:    {}", header.version)?;
            writeln!(out, "epoch:      {}", header.epoch)?;
            writeln!(out, "created_at: {}", header.created_at.to_rfc3339())?;
            writeln!(out, "body:       {} bytes, crc32 {:08x}", header.body_len, header.crc32)?;

            let state = format::decode(&data, &origin)?;
            writeln!(out, "state_dict: {} bytes", state.state_dict.len())?;
            writeln!(out, "optimizer:  {} bytes", state.optimizer.len())?;
            match &state.scheduler {
                Some(scheduler) => writeln!(out, "scheduler:  {} bytes", scheduler.len())?,
                None => writeln!(out, "scheduler:  none")?,
            }
            for (key, value) in &state.metadata {
                writeln!(out, "meta {}: {}", key, value)?;
            }
        }
    }
    Ok(())
}
