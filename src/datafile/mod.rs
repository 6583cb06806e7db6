//! Data File Module
//!
//! The single append-only file that holds every write and delete.
//!
//! ## Responsibilities
//! - Encode entries into a fixed-header binary record
//! - Append records at the write cursor
//! - Read one record back from any offset handed out by `append`
//! - Scan the whole file in append order (recovery, merge)
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Entry 1                                                  │
//! │ ┌────────────┬──────────────┬──────────┬─────┬─────────┐ │
//! │ │KeySize (4) │ValueSize (4) │ Mark (2) │ Key │  Value  │ │
//! │ └────────────┴──────────────┴──────────┴─────┴─────────┘ │
//! ├──────────────────────────────────────────────────────────┤
//! │ Entry 2                                                  │
//! │ ...                                                      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Header fields are big-endian. Mark: 0 = PUT, 1 = DELETE (tombstone, empty
//! value). Records are never rewritten in place, so an offset stays valid
//! until the file is replaced by a merge.

mod entry;
mod file;
mod iterator;

pub use entry::{Entry, EntryHeader, Mark, HEADER_SIZE};
pub use file::AppendLog;
pub use iterator::LogIterator;

/// Name of the active data file inside the data directory
pub const DATA_FILE_NAME: &str = "logkv.data";

/// Name of the temporary file a merge writes before swapping it in
pub const MERGE_FILE_NAME: &str = "logkv.data.merge";

/// Where recovery saves bytes it cuts from a large torn tail
pub const TORN_FILE_NAME: &str = "logkv.data.torn";

/// Smallest possible record: a header plus a one-byte key
pub const MIN_RECORD_SIZE: u64 = HEADER_SIZE as u64 + 1;
