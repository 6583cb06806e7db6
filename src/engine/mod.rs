//! Engine Module
//!
//! The storage engine: one append-only data file plus an in-memory index.
//!
//! ## Responsibilities
//! - Serve put/get/delete against the data file
//! - Rebuild the index from the data file on open (recovery)
//! - Reclaim space held by overwritten and deleted keys (merge)

mod merge;
mod recovery;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::config::Config;
use crate::datafile::{AppendLog, Entry, DATA_FILE_NAME, MERGE_FILE_NAME};
use crate::error::{KvError, Result};
use crate::index::Index;

pub use merge::MergeStats;
pub use recovery::RecoveryStats;

/// State guarded by the engine lock. The index only makes sense relative to
/// the exact log it was built from, so both live behind the same lock.
struct Inner {
    log: AppendLog,
    index: Index,
}

/// The main storage engine
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// One `RwLock` covers the index and all data file I/O.
///
/// - **Writes** (put/delete/merge/sync): exclusive lock
///   - An append (offset read + write + cursor advance) is one critical section
///   - Merge holds the lock for its whole scan-and-rewrite
///
/// - **Reads** (get/contains_key/len): shared lock
///   - Records are never rewritten in place and reads are positional, so any
///     number of readers can run at once
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Directory holding the data file
    data_dir: PathBuf,

    /// Data file + index
    inner: RwLock<Inner>,

    /// What the last open found in the data file
    recovery_stats: RecoveryStats,
}

impl Engine {
    /// Open or create an engine in `path` with default settings
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let config = Config::builder().data_dir(path.as_ref()).build();
        Self::open_with_config(config)
    }

    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Create the data directory if it doesn't exist
    /// 2. Drop a merge file left behind by a crash
    /// 3. Open the data file, appending after whatever is already there
    /// 4. Replay the data file to rebuild the index
    pub fn open_with_config(config: Config) -> Result<Self> {
        config.validate()?;

        // Step 1: Create data directory if it doesn't exist
        fs::create_dir_all(&config.data_dir)?;
        let data_dir = config.data_dir.clone();

        // Step 2: An unfinished merge never touched the data file
        remove_stale_merge_file(&data_dir)?;

        // Step 3: Open the data file
        let mut log = AppendLog::open(&data_dir, DATA_FILE_NAME, config.sync_strategy)?;

        // Step 4: Rebuild the index
        let mut index = Index::new();
        let recovery_stats =
            recovery::rebuild_index(&mut log, &mut index, &data_dir, config.repair_torn_tail)?;

        tracing::info!(
            "Opened {}: {} live keys, {} records replayed, {} bytes",
            log.path().display(),
            index.len(),
            recovery_stats.entries_replayed,
            log.len()
        );

        Ok(Self {
            config,
            data_dir,
            inner: RwLock::new(Inner { log, index }),
            recovery_stats,
        })
    }

    /// Get a value by key
    ///
    /// Returns:
    /// - `Ok(Some(value))` — key is live
    /// - `Ok(None)` — key was never written, was deleted, or is empty
    /// - `Err(_)` — I/O failure, or the index disagrees with the data file
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if key.is_empty() {
            return Ok(None);
        }

        let inner = self.inner.read();

        let offset = match inner.index.get(key) {
            Some(offset) => offset,
            None => return Ok(None),
        };

        match inner.log.read_at(offset)? {
            Some(entry) if entry.key != key => Err(KvError::index_inconsistency(
                offset,
                "the record there belongs to a different key",
            )),
            Some(entry) if entry.is_tombstone() => Err(KvError::index_inconsistency(
                offset,
                "the record there is a tombstone",
            )),
            Some(entry) => Ok(Some(entry.value)),
            None => Err(KvError::index_inconsistency(
                offset,
                "that is past the end of the data file",
            )),
        }
    }

    /// Put a key-value pair
    ///
    /// An empty key is ignored. The index is only updated after the record
    /// is fully written.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        if key.is_empty() {
            tracing::debug!("Ignoring put with empty key");
            return Ok(());
        }

        let entry = Entry::put(key, value);

        let mut inner = self.inner.write();
        let offset = inner.log.append(&entry)?;
        inner.index.insert(entry.key, offset);

        Ok(())
    }

    /// Delete a key
    ///
    /// Writes a tombstone only when the key is currently live; deleting an
    /// absent (or empty) key is a no-op.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        if key.is_empty() {
            tracing::debug!("Ignoring delete with empty key");
            return Ok(());
        }

        let mut inner = self.inner.write();
        if !inner.index.contains_key(key) {
            return Ok(());
        }

        inner.log.append(&Entry::delete(key))?;
        inner.index.remove(key);

        Ok(())
    }

    /// Force the data file to disk
    pub fn sync(&self) -> Result<()> {
        self.inner.write().log.sync()
    }

    /// Close the engine gracefully
    ///
    /// Syncs the data file. Dropping an engine without closing it is safe but
    /// leaves durability of the last writes to the OS.
    pub fn close(self) -> Result<()> {
        self.sync()?;
        tracing::debug!("Closed {}", self.data_dir.display());
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// True if `key` is live
    pub fn contains_key(&self, key: &[u8]) -> bool {
        !key.is_empty() && self.inner.read().index.contains_key(key)
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.inner.read().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().index.is_empty()
    }

    /// Bytes in the data file, live and dead records alike
    pub fn log_size(&self) -> u64 {
        self.inner.read().log.len()
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the active data file
    pub fn data_file_path(&self) -> PathBuf {
        self.data_dir.join(DATA_FILE_NAME)
    }

    /// What recovery found when this engine was opened
    pub fn recovery_stats(&self) -> RecoveryStats {
        self.recovery_stats
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Remove a merge file a crashed merge left behind
fn remove_stale_merge_file(dir: &Path) -> Result<()> {
    let path = dir.join(MERGE_FILE_NAME);
    match fs::remove_file(&path) {
        Ok(()) => {
            tracing::warn!("Removed unfinished merge file {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncStrategy;
    use tempfile::TempDir;

    fn sync_every_write(dir: &Path) -> Config {
        Config::builder()
            .data_dir(dir)
            .sync_strategy(SyncStrategy::EveryWrite)
            .build()
    }

    #[test]
    fn test_failed_sync_on_put_keeps_old_value() {
        let temp = TempDir::new().unwrap();
        {
            let engine = Engine::open_with_config(sync_every_write(temp.path())).unwrap();
            engine.put(b"k", b"v1").unwrap();
            let size = engine.log_size();

            engine.inner.write().log.fail_next_sync();
            let result = engine.put(b"k", b"v2");

            assert!(matches!(result, Err(KvError::Io(_))));
            assert_eq!(engine.get(b"k").unwrap(), Some(b"v1".to_vec()));
            assert_eq!(engine.log_size(), size);
            assert_eq!(fs::metadata(engine.data_file_path()).unwrap().len(), size);

            // The engine stays usable after the failure
            engine.put(b"other", b"x").unwrap();
        }

        let engine = Engine::open(temp.path()).unwrap();

        assert_eq!(engine.get(b"k").unwrap(), Some(b"v1".to_vec()));
        assert_eq!(engine.get(b"other").unwrap(), Some(b"x".to_vec()));
        assert_eq!(engine.recovery_stats().entries_replayed, 2);
    }

    #[test]
    fn test_failed_sync_on_delete_keeps_key() {
        let temp = TempDir::new().unwrap();
        {
            let engine = Engine::open_with_config(sync_every_write(temp.path())).unwrap();
            engine.put(b"k", b"v1").unwrap();

            engine.inner.write().log.fail_next_sync();
            assert!(engine.delete(b"k").is_err());

            assert!(engine.contains_key(b"k"));
            assert_eq!(engine.get(b"k").unwrap(), Some(b"v1".to_vec()));
        }

        let engine = Engine::open(temp.path()).unwrap();

        assert_eq!(engine.get(b"k").unwrap(), Some(b"v1".to_vec()));
        assert_eq!(engine.recovery_stats().deletes, 0);
    }
}
