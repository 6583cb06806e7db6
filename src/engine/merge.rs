//! Merge (compaction)
//!
//! Rewrites only the live records into a fresh data file and swaps it in.
//!
//! ## Steps
//! 1. Scan the data file; a record is live iff the index points at its offset
//! 2. Append live records, in their original order, to `logkv.data.merge`
//! 3. fsync the merge file
//! 4. Rename it over `logkv.data` (the commit point)
//!
//! A crash before step 4 leaves the old data file untouched; the merge file
//! is removed on the next open.

use std::fs;
use std::path::Path;

use crate::config::SyncStrategy;
use crate::datafile::{AppendLog, DATA_FILE_NAME, MERGE_FILE_NAME};
use crate::error::{KvError, Result};
use crate::index::Index;

use super::{Engine, Inner};

/// Result of a merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Records read from the old data file
    pub entries_scanned: u64,

    /// Records copied into the new data file
    pub entries_kept: u64,

    /// Data file size before the merge
    pub bytes_before: u64,

    /// Data file size after the merge
    pub bytes_after: u64,
}

impl MergeStats {
    pub fn bytes_reclaimed(&self) -> u64 {
        self.bytes_before - self.bytes_after
    }
}

impl Engine {
    /// Compact the data file down to the live records
    ///
    /// Blocks all other operations while it runs. If anything fails before
    /// the new file is renamed into place, the engine keeps using the old
    /// file and index unchanged.
    pub fn merge(&self) -> Result<MergeStats> {
        let mut inner = self.inner.write();

        if inner.log.is_empty() {
            tracing::debug!("Skipping merge of empty data file");
            return Ok(MergeStats::default());
        }

        let (mut log, index, mut stats) = match rewrite_live(&inner, &self.data_dir) {
            Ok(rewritten) => rewritten,
            Err(e) => {
                discard_merge_file(&self.data_dir);
                return Err(e);
            }
        };

        if let Err(e) = log.rename_to(&self.data_dir, DATA_FILE_NAME) {
            discard_merge_file(&self.data_dir);
            return Err(e);
        }
        sync_dir(&self.data_dir);

        log.set_sync_strategy(self.config.sync_strategy);
        stats.bytes_after = log.len();

        inner.log = log;
        inner.index = index;

        tracing::info!(
            "Merged {}: kept {} of {} records, {} -> {} bytes",
            self.data_dir.display(),
            stats.entries_kept,
            stats.entries_scanned,
            stats.bytes_before,
            stats.bytes_after
        );

        Ok(stats)
    }
}

/// Write the live records of `inner` into a fresh merge file
///
/// Returns the synced merge file and an index pointing into it.
fn rewrite_live(inner: &Inner, dir: &Path) -> Result<(AppendLog, Index, MergeStats)> {
    let mut stats = MergeStats {
        bytes_before: inner.log.len(),
        ..MergeStats::default()
    };

    let mut merged = AppendLog::create(dir, MERGE_FILE_NAME, SyncStrategy::Never)?;
    let mut index = Index::new();

    for item in inner.log.iter() {
        let (offset, entry) = item?;
        stats.entries_scanned += 1;

        // Superseded PUTs and every tombstone fail this check
        if !inner.index.points_at(&entry.key, offset) {
            continue;
        }

        let new_offset = merged.append(&entry)?;
        index.insert(entry.key, new_offset);
        stats.entries_kept += 1;
    }

    if index.len() != inner.index.len() {
        return Err(missing_live_record(&inner.index, &index));
    }

    merged.sync()?;
    Ok((merged, index, stats))
}

/// Name a key the old index holds but the scan never found a record for
fn missing_live_record(old: &Index, rewritten: &Index) -> KvError {
    let lost = old.iter().find(|(key, _)| !rewritten.contains_key(key));
    match lost {
        Some((key, offset)) => KvError::index_inconsistency(
            offset,
            format!("no record for indexed key of {} bytes", key.len()),
        ),
        None => KvError::index_inconsistency(0, "merge kept more keys than the index holds"),
    }
}

/// Best-effort removal of a merge file after a failed merge
fn discard_merge_file(dir: &Path) {
    let path = dir.join(MERGE_FILE_NAME);
    if let Err(e) = fs::remove_file(&path) {
        tracing::debug!("Could not remove merge file {}: {}", path.display(), e);
    }
}

/// Persist the rename itself
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    let result = fs::File::open(dir).and_then(|d| d.sync_all());
    if let Err(e) = result {
        tracing::warn!("Failed to sync directory {}: {}", dir.display(), e);
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
