//! Advisory per-module lock files
//!
//! A lock lives at `<dir>/.<module>.lock` and is held through an exclusive
//! `flock`-style lock on the open file. The file itself is left on disk;
//! only the OS lock matters. Dropping the guard releases it.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use runtime_core::{Error, Result};
use tracing::{debug, warn};

/// Path of the lock file guarding `module` inside `dir`
pub fn lock_path(dir: &Path, module: &str) -> PathBuf {
    dir.join(format!(".{module}.lock"))
}

/// Exclusive hold on a module's snapshots
#[derive(Debug)]
pub struct ModuleLock {
    file: File,
    path: PathBuf,
}

impl ModuleLock {
    /// Take the lock without blocking.
    ///
    /// Fails with `ModuleLocked` when another handle, in this process or
    /// another, already holds it.
    pub fn try_acquire(dir: &Path, module: &str) -> Result<Self> {
        let path = lock_path(dir, module);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| Error::storage(format!("Failed to open lock file {:?}", path), e))?;

        file.try_lock_exclusive()
            .map_err(|e| lock_error(module, &path, e))?;

        debug!(lock = %path.display(), "Acquired module lock");
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Contention becomes `ModuleLocked`; any other failure (e.g. `ENOLCK` on a
/// network filesystem) stays a storage error
fn lock_error(module: &str, path: &Path, e: std::io::Error) -> Error {
    if e.kind() == fs2::lock_contended_error().kind() {
        Error::ModuleLocked {
            module: module.to_string(),
            lock_path: path.display().to_string(),
        }
    } else {
        Error::storage(format!("Failed to lock {:?}", path), e)
    }
}

impl Drop for ModuleLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(lock = %self.path.display(), error = %e, "Failed to release module lock");
        }
    }
}
