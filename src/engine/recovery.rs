//! Index recovery
//!
//! Rebuilds the index by replaying the data file from offset 0.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::datafile::{AppendLog, Mark, HEADER_SIZE, MIN_RECORD_SIZE, TORN_FILE_NAME};
use crate::error::{KvError, Result};
use crate::index::Index;

/// Result of replaying the data file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryStats {
    /// Number of complete records read
    pub entries_replayed: u64,

    /// How many of them were PUT records
    pub puts: u64,

    /// How many of them were tombstones
    pub deletes: u64,

    /// Bytes of a torn final record cut from the end of the file
    pub truncated_bytes: u64,

    /// Bytes copied to the torn file before cutting
    pub salvaged_bytes: u64,
}

/// Replay `log` into `index`
///
/// Records are applied in append order, so a later record for a key always
/// wins over an earlier one.
///
/// A record that runs past the end of the file is either a crash mid-append
/// or a damaged size field. It is cut off when the remaining bytes are too
/// short to hide another record. Larger tails fail with `Corruption` unless
/// `repair` is set, in which case they are copied to the torn file and cut.
/// Any other decode error aborts.
pub(super) fn rebuild_index(
    log: &mut AppendLog,
    index: &mut Index,
    dir: &Path,
    repair: bool,
) -> Result<RecoveryStats> {
    let mut stats = RecoveryStats::default();
    let mut torn_at = None;

    for item in log.iter() {
        match item {
            Ok((offset, entry)) => {
                stats.entries_replayed += 1;
                match entry.mark {
                    Mark::Put => {
                        stats.puts += 1;
                        index.insert(entry.key, offset);
                    }
                    Mark::Delete => {
                        stats.deletes += 1;
                        index.remove(&entry.key);
                    }
                }
            }
            Err(KvError::TruncatedRecord { offset }) => {
                torn_at = Some(offset);
                break;
            }
            Err(e) => return Err(e),
        }
    }

    let offset = match torn_at {
        Some(offset) => offset,
        None => return Ok(stats),
    };

    let torn_bytes = log.len() - offset;

    if !tail_is_disposable(torn_bytes) {
        if !repair {
            return Err(KvError::corruption(
                offset,
                format!(
                    "record runs past the end of the file and {} bytes follow it; \
                     refusing to cut them (enable torn tail repair to save and cut)",
                    torn_bytes
                ),
            ));
        }
        stats.salvaged_bytes = salvage_tail(log, offset, dir)?;
    }

    stats.truncated_bytes = torn_bytes;
    tracing::warn!(
        "Truncating torn record at offset {} in {} ({} bytes)",
        offset,
        log.path().display(),
        torn_bytes
    );
    log.truncate(offset)?;

    Ok(stats)
}

/// True when `torn_bytes` can't hold the torn record's header plus one more
/// complete record, so cutting them can't lose a valid record
fn tail_is_disposable(torn_bytes: u64) -> bool {
    torn_bytes < HEADER_SIZE as u64 + MIN_RECORD_SIZE
}

/// Append the bytes from `offset` to the end of `log` to the torn file
fn salvage_tail(log: &AppendLog, offset: u64, dir: &Path) -> Result<u64> {
    let tail = log.read_tail(offset)?;
    let path = dir.join(TORN_FILE_NAME);

    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    file.write_all(&tail)?;
    file.sync_all()?;

    tracing::warn!(
        "Saved {} bytes from offset {} of {} to {}",
        tail.len(),
        offset,
        log.path().display(),
        path.display()
    );

    Ok(tail.len() as u64)
}
