//! In-memory index
//!
//! Maps each live key to the offset of its most recent PUT record.
//! Never persisted; the engine rebuilds it from the data file on open.

use std::collections::HashMap;

/// Key → data file offset of the key's latest live record
#[derive(Debug, Default)]
pub struct Index {
    entries: HashMap<Vec<u8>, u64>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point `key` at `offset`, returning the offset it replaced
    pub fn insert(&mut self, key: Vec<u8>, offset: u64) -> Option<u64> {
        self.entries.insert(key, offset)
    }

    pub fn remove(&mut self, key: &[u8]) -> Option<u64> {
        self.entries.remove(key)
    }

    pub fn get(&self, key: &[u8]) -> Option<u64> {
        self.entries.get(key).copied()
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }

    /// True when `offset` is exactly where `key`'s live record sits
    pub fn points_at(&self, key: &[u8], offset: u64) -> bool {
        self.get(key) == Some(offset)
    }

    /// Every (key, offset) pair, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], u64)> {
        self.entries.iter().map(|(k, &off)| (k.as_slice(), off))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
