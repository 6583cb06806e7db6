//! Data file iterator
//!
//! Sequential scan over every record, used by recovery and merge.

use crate::error::Result;

use super::entry::Entry;
use super::file::AppendLog;

/// Iterator over `(offset, entry)` pairs in append order
///
/// Stops cleanly at the end of the log. On an error it yields the error once
/// and then stops.
pub struct LogIterator<'a> {
    log: &'a AppendLog,
    /// Offset of the next record to read
    position: u64,
    done: bool,
}

impl<'a> LogIterator<'a> {
    pub(super) fn new(log: &'a AppendLog) -> Self {
        Self {
            log,
            position: 0,
            done: false,
        }
    }
}

impl<'a> Iterator for LogIterator<'a> {
    type Item = Result<(u64, Entry)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.log.read_at(self.position) {
            Ok(Some(entry)) => {
                let at = self.position;
                self.position += entry.encoded_size();
                Some(Ok((at, entry)))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
