//! Append Log
//!
//! One data file plus the cursor where the next record goes.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::config::SyncStrategy;
use crate::error::{KvError, Result};

use super::entry::{Entry, EntryHeader, HEADER_SIZE};
use super::iterator::LogIterator;

/// Append-only data file with positional reads
///
/// ## Concurrency:
/// - `append`, `sync`, `truncate` need `&mut self` (single writer)
/// - `read_at` and `iter` only need `&self`; reads are positional, so they
///   never move a shared file cursor and can run side by side
pub struct AppendLog {
    /// Open read/write handle
    file: File,
    /// Where the file lives
    path: PathBuf,
    /// Next append position == logical end of valid data
    offset: u64,
    sync_strategy: SyncStrategy,
    /// Appends since the last fsync
    unsynced: usize,
    /// Make the next fsync fail
    #[cfg(test)]
    sync_fault: bool,
}

impl AppendLog {
    /// Open or create `file_name` inside `dir`
    ///
    /// Existing contents are kept; appends resume at the current file size.
    pub fn open(dir: &Path, file_name: &str, sync_strategy: SyncStrategy) -> Result<Self> {
        let path = dir.join(file_name);
        let file = open_options(false).open(&path)?;
        let offset = file.metadata()?.len();

        Ok(Self {
            file,
            path,
            offset,
            sync_strategy,
            unsynced: 0,
            #[cfg(test)]
            sync_fault: false,
        })
    }

    /// Create `file_name` inside `dir`, discarding anything already there
    pub fn create(dir: &Path, file_name: &str, sync_strategy: SyncStrategy) -> Result<Self> {
        let path = dir.join(file_name);
        let file = open_options(true).open(&path)?;

        Ok(Self {
            file,
            path,
            offset: 0,
            sync_strategy,
            unsynced: 0,
            #[cfg(test)]
            sync_fault: false,
        })
    }

    /// Append an entry and return the offset it was written at
    ///
    /// The cursor only moves once every byte is written and, when the sync
    /// strategy asks for it, synced. On any failure the file is cut back to
    /// the old cursor so the record never becomes part of the log.
    pub fn append(&mut self, entry: &Entry) -> Result<u64> {
        let at = self.offset;
        let buf = entry.encode()?;

        if let Err(e) = write_all_at(&self.file, &buf, at) {
            self.discard_from(at);
            return Err(e.into());
        }

        let sync_now = match self.sync_strategy {
            SyncStrategy::Never => false,
            SyncStrategy::EveryWrite => true,
            SyncStrategy::EveryNEntries { count } => self.unsynced + 1 >= count,
        };

        if sync_now {
            if let Err(e) = self.sync_file() {
                self.discard_from(at);
                return Err(e.into());
            }
            self.unsynced = 0;
        } else {
            self.unsynced += 1;
        }

        self.offset += buf.len() as u64;
        Ok(at)
    }

    /// Drop whatever a failed append left at or past `at`
    fn discard_from(&mut self, at: u64) {
        if let Err(e) = self.file.set_len(at) {
            tracing::warn!(
                "Failed to trim failed append at {} in {}: {}",
                at,
                self.path.display(),
                e
            );
        }
    }

    /// Read the record starting at `offset`
    ///
    /// Returns:
    /// - `Ok(Some(entry))` — a complete record
    /// - `Ok(None)` — `offset` is at or past the end of valid data
    /// - `Err(TruncatedRecord)` — the record runs past the end of the file
    /// - `Err(Corruption)` — the header does not decode
    pub fn read_at(&self, offset: u64) -> Result<Option<Entry>> {
        if offset >= self.offset {
            return Ok(None);
        }

        let header = self.read_header_at(offset)?;

        if offset + header.encoded_size() > self.offset {
            return Err(KvError::TruncatedRecord { offset });
        }

        let payload_at = offset + HEADER_SIZE as u64;

        let mut key = vec![0u8; header.key_size as usize];
        read_exact_at(&self.file, &mut key, payload_at).map_err(|e| short_read(e, offset))?;

        let mut value = vec![0u8; header.value_size as usize];
        if !value.is_empty() {
            read_exact_at(&self.file, &mut value, payload_at + header.key_size as u64)
                .map_err(|e| short_read(e, offset))?;
        }

        Ok(Some(Entry {
            key,
            value,
            mark: header.mark,
        }))
    }

    /// Read and validate only the fixed header at `offset`
    fn read_header_at(&self, offset: u64) -> Result<EntryHeader> {
        if offset + HEADER_SIZE as u64 > self.offset {
            return Err(KvError::TruncatedRecord { offset });
        }

        let mut buf = [0u8; HEADER_SIZE];
        read_exact_at(&self.file, &mut buf, offset).map_err(|e| short_read(e, offset))?;

        let header = EntryHeader::decode(&buf, offset)?;
        if header.key_size == 0 {
            return Err(KvError::corruption(offset, "zero-length key"));
        }
        Ok(header)
    }

    /// Scan every record from offset 0
    pub fn iter(&self) -> LogIterator<'_> {
        LogIterator::new(self)
    }

    /// Force file data to disk
    pub fn sync(&mut self) -> Result<()> {
        self.sync_file()?;
        self.unsynced = 0;
        Ok(())
    }

    fn sync_file(&mut self) -> io::Result<()> {
        if self.take_sync_fault() {
            return Err(io::Error::new(io::ErrorKind::Other, "injected fsync failure"));
        }
        self.file.sync_data()
    }

    #[cfg(test)]
    fn take_sync_fault(&mut self) -> bool {
        std::mem::take(&mut self.sync_fault)
    }

    #[cfg(not(test))]
    fn take_sync_fault(&mut self) -> bool {
        false
    }

    /// Make the next fsync on this file fail
    #[cfg(test)]
    pub(crate) fn fail_next_sync(&mut self) {
        self.sync_fault = true;
    }

    /// Raw bytes from `from` to the end of valid data
    pub(crate) fn read_tail(&self, from: u64) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.offset.saturating_sub(from) as usize];
        read_exact_at(&self.file, &mut buf, from)?;
        Ok(buf)
    }

    /// Cut the file back to `len` bytes (drops a torn tail)
    pub fn truncate(&mut self, len: u64) -> Result<()> {
        self.file.set_len(len)?;
        self.file.sync_data()?;
        self.offset = len;
        self.unsynced = 0;
        Ok(())
    }

    /// Atomically move this file to `file_name` inside `dir`, replacing any
    /// file already there. The open handle keeps working after the move.
    pub fn rename_to(&mut self, dir: &Path, file_name: &str) -> Result<()> {
        let target = dir.join(file_name);
        fs::rename(&self.path, &target)?;
        self.path = target;
        Ok(())
    }

    pub(crate) fn set_sync_strategy(&mut self, strategy: SyncStrategy) {
        self.sync_strategy = strategy;
    }

    /// Next append position
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Bytes of valid data in the file
    pub fn len(&self) -> u64 {
        self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.offset == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

// =============================================================================
// Private Helpers
// =============================================================================

fn open_options(truncate: bool) -> OpenOptions {
    let mut opts = OpenOptions::new();
    opts.read(true).write(true).create(true).truncate(truncate);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o644);
    }

    opts
}

/// A short read inside a record that should exist is corruption, not EOF
fn short_read(err: io::Error, offset: u64) -> KvError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        KvError::corruption(offset, "short read inside record")
    } else {
        KvError::Io(err)
    }
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(unix)]
fn write_all_at(file: &File, buf: &[u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ))
            }
            Ok(n) => {
                let rest = buf;
                buf = &mut rest[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(windows)]
fn write_all_at(file: &File, mut buf: &[u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_write(buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "failed to write whole buffer",
                ))
            }
            Ok(n) => {
                buf = &buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    use crate::datafile::DATA_FILE_NAME;

    fn file_len(log: &AppendLog) -> u64 {
        fs::metadata(log.path()).unwrap().len()
    }

    #[test]
    fn test_failed_sync_rolls_back_append() {
        let temp = TempDir::new().unwrap();
        let mut log = AppendLog::open(temp.path(), DATA_FILE_NAME, SyncStrategy::EveryWrite).unwrap();

        log.append(&Entry::put(b"k".to_vec(), b"v1".to_vec())).unwrap();
        let end = log.offset();

        log.fail_next_sync();
        let result = log.append(&Entry::put(b"k".to_vec(), b"v2".to_vec()));

        assert!(matches!(result, Err(KvError::Io(_))));
        assert_eq!(log.offset(), end);
        assert_eq!(file_len(&log), end);
        assert_eq!(log.read_at(end).unwrap(), None);

        // The next append lands where the failed one would have
        let at = log.append(&Entry::put(b"k".to_vec(), b"v3".to_vec())).unwrap();
        assert_eq!(at, end);
        assert_eq!(log.read_at(at).unwrap().unwrap().value, b"v3".to_vec());
    }

    #[test]
    fn test_failed_batched_sync_rolls_back_only_current_append() {
        let temp = TempDir::new().unwrap();
        let strategy = SyncStrategy::EveryNEntries { count: 2 };
        let mut log = AppendLog::open(temp.path(), DATA_FILE_NAME, strategy).unwrap();

        log.append(&Entry::put(b"a".to_vec(), b"1".to_vec())).unwrap();
        let end = log.offset();

        log.fail_next_sync();
        assert!(log.append(&Entry::put(b"b".to_vec(), b"2".to_vec())).is_err());

        assert_eq!(log.offset(), end);
        assert_eq!(file_len(&log), end);
        assert_eq!(log.iter().count(), 1);
    }

    #[test]
    fn test_read_tail() {
        let temp = TempDir::new().unwrap();
        let mut log = AppendLog::open(temp.path(), DATA_FILE_NAME, SyncStrategy::Never).unwrap();

        log.append(&Entry::put(b"a".to_vec(), b"1".to_vec())).unwrap();
        let second = Entry::put(b"b".to_vec(), b"2".to_vec());
        let at = log.append(&second).unwrap();

        assert_eq!(log.read_tail(at).unwrap(), second.encode().unwrap().to_vec());
        assert!(log.read_tail(log.offset()).unwrap().is_empty());
    }
}
