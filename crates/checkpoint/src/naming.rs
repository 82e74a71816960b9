//! Snapshot file naming and ordering

use runtime_core::{Epoch, Error, Result, SnapshotInfo};

/// Extension of snapshot files
pub const SNAPSHOT_EXTENSION: &str = "ckpt";

/// Separator between the module name and the iteration
const EPOCH_MARKER: &str = "_epoch_";

/// Reject names that would escape the checkpoint directory or collide with
/// hidden temp and lock files
pub fn validate_module_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        "must not be empty"
    } else if name.starts_with('.') {
        "must not start with '.'"
    } else if name.contains(['/', '\\']) {
        "must not contain path separators"
    } else {
        return Ok(());
    };

    Err(Error::InvalidModuleName {
        name: name.to_string(),
        reason: reason.to_string(),
    })
}

/// Prefix shared by every snapshot file of a module
pub fn snapshot_prefix(module: &str) -> String {
    format!("{module}{EPOCH_MARKER}")
}

/// `<module>_epoch_<epoch>.ckpt`
pub fn snapshot_file_name(module: &str, epoch: Epoch) -> String {
    format!("{module}{EPOCH_MARKER}{epoch}.{SNAPSHOT_EXTENSION}")
}

/// Recover the iteration from a snapshot file name of `module`.
///
/// Returns `None` for names that belong to another module or are not
/// snapshot files at all.
pub fn parse_snapshot_epoch(module: &str, file_name: &str) -> Option<Epoch> {
    let digits = file_name
        .strip_prefix(module)?
        .strip_prefix(EPOCH_MARKER)?
        .strip_suffix(SNAPSHOT_EXTENSION)?
        .strip_suffix('.')?;

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Sort newest first by modification time; equal times fall back to the
/// higher iteration first
pub fn sort_newest_first(snapshots: &mut [SnapshotInfo]) {
    snapshots.sort_by(|a, b| {
        b.modified
            .cmp(&a.modified)
            .then_with(|| b.epoch.cmp(&a.epoch))
    });
}
