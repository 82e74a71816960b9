//! Snapshot file format
//!
//! ```text
//! offset  size  field
//!      0     4  magic "CKPT"
//!      4     4  format version (u32 LE)
//!      8     8  epoch (u64 LE)
//!     16     1  flags (bit 0: scheduler state present)
//!     17     8  created at, Unix milliseconds (i64 LE)
//!     25     8  body length (u64 LE)
//!     33     4  CRC32 of the body (u32 LE)
//!     37     n  body: bincode-encoded TrainingState
//! ```
//!
//! The header duplicates the epoch and scheduler flag so tools can describe
//! a snapshot without decoding the body.

use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use runtime_core::{Epoch, Error, Result};

use crate::state::TrainingState;

/// Magic bytes for checkpoint files
pub const CHECKPOINT_MAGIC: [u8; 4] = *b"CKPT";

/// Checkpoint format version
pub const CHECKPOINT_VERSION: u32 = 1;

/// Size of the fixed header in bytes
pub const HEADER_LEN: usize = 37;

const FLAG_SCHEDULER: u8 = 0b0000_0001;

/// Checkpoint file header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointHeader {
    pub version: u32,
    pub epoch: Epoch,
    pub has_scheduler: bool,
    pub created_at: DateTime<Utc>,
    pub body_len: u64,
    pub crc32: u32,
}

/// Encode a training state into the on-disk representation
pub fn encode(state: &TrainingState, created_at: DateTime<Utc>) -> Result<Bytes> {
    let body = bincode::serialize(state)?;

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&body);
    let crc = hasher.finalize();

    let flags = if state.scheduler.is_some() {
        FLAG_SCHEDULER
    } else {
        0
    };

    let mut buf = Vec::with_capacity(HEADER_LEN + body.len());
    buf.extend_from_slice(&CHECKPOINT_MAGIC);
    buf.extend_from_slice(&CHECKPOINT_VERSION.to_le_bytes());
    buf.extend_from_slice(&state.epoch.to_le_bytes());
    buf.push(flags);
    buf.extend_from_slice(&created_at.timestamp_millis().to_le_bytes());
    buf.extend_from_slice(&(body.len() as u64).to_le_bytes());
    buf.extend_from_slice(&crc.to_le_bytes());
    buf.extend_from_slice(&body);

    Ok(Bytes::from(buf))
}

/// Decode only the header. `origin` names the file in error messages.
pub fn read_header(data: &[u8], origin: &str) -> Result<CheckpointHeader> {
    let corrupted = |reason: String| Error::CheckpointCorrupted {
        path: origin.to_string(),
        reason,
    };

    if data.len() < HEADER_LEN {
        return Err(corrupted(format!(
            "truncated header: {} of {} bytes",
            data.len(),
            HEADER_LEN
        )));
    }

    if data[0..4] != CHECKPOINT_MAGIC {
        return Err(corrupted("invalid checkpoint magic".to_string()));
    }

    let version = le_u32(data, 4);
    if version != CHECKPOINT_VERSION {
        return Err(Error::IncompatibleVersion {
            path: origin.to_string(),
            found: version,
            expected: CHECKPOINT_VERSION,
        });
    }

    let flags = data[16];
    if flags & !FLAG_SCHEDULER != 0 {
        return Err(corrupted(format!("unknown header flags {:#010b}", flags)));
    }

    let created_ms = le_u64(data, 17) as i64;
    let created_at = Utc
        .timestamp_millis_opt(created_ms)
        .single()
        .ok_or_else(|| corrupted(format!("invalid creation time {}", created_ms)))?;

    Ok(CheckpointHeader {
        version,
        epoch: le_u64(data, 8),
        has_scheduler: flags & FLAG_SCHEDULER != 0,
        created_at,
        body_len: le_u64(data, 25),
        crc32: le_u32(data, 33),
    })
}

/// Decode and verify a full snapshot
pub fn decode(data: &[u8], origin: &str) -> Result<TrainingState> {
    let header = read_header(data, origin)?;
    let corrupted = |reason: String| Error::CheckpointCorrupted {
        path: origin.to_string(),
        reason,
    };

    let body = &data[HEADER_LEN..];
    if body.len() as u64 != header.body_len {
        return Err(corrupted(format!(
            "body length mismatch: header says {}, found {}",
            header.body_len,
            body.len()
        )));
    }

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(body);
    let crc = hasher.finalize();
    if crc != header.crc32 {
        return Err(corrupted(format!(
            "checksum mismatch: expected {:08x}, computed {:08x}",
            header.crc32, crc
        )));
    }

    let state: TrainingState = bincode::deserialize(body)
        .map_err(|e| corrupted(format!("undecodable body: {}", e)))?;

    if state.epoch != header.epoch {
        return Err(corrupted(format!(
            "epoch mismatch: header {}, body {}",
            header.epoch, state.epoch
        )));
    }
    if state.scheduler.is_some() != header.has_scheduler {
        return Err(corrupted("scheduler flag disagrees with body".to_string()));
    }

    Ok(state)
}

fn le_u32(data: &[u8], at: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&data[at..at + 4]);
    u32::from_le_bytes(buf)
}

fn le_u64(data: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&data[at..at + 8]);
    u64::from_le_bytes(buf)
}
