//! Data file entry definitions
//!
//! Defines the record format and its encode / header-decode operations.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{KvError, Result};

/// Header size: KeySize (4) + ValueSize (4) + Mark (2) = 10 bytes
pub const HEADER_SIZE: usize = 10;

/// Kind of change a record carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Mark {
    /// A live value for the key
    Put = 0,

    /// A tombstone: the key's earlier values are gone
    Delete = 1,
}

impl TryFrom<u16> for Mark {
    type Error = u16;

    fn try_from(raw: u16) -> std::result::Result<Self, Self::Error> {
        match raw {
            0 => Ok(Mark::Put),
            1 => Ok(Mark::Delete),
            other => Err(other),
        }
    }
}

/// Fixed-size part of a record, decoded without touching the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHeader {
    pub key_size: u32,
    pub value_size: u32,
    pub mark: Mark,
}

impl EntryHeader {
    /// Parse the first [`HEADER_SIZE`] bytes of `buf`
    ///
    /// `offset` is only used to label errors.
    pub fn decode(mut buf: &[u8], offset: u64) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(KvError::corruption(
                offset,
                format!("header needs {} bytes, got {}", HEADER_SIZE, buf.len()),
            ));
        }

        let key_size = buf.get_u32();
        let value_size = buf.get_u32();
        let raw_mark = buf.get_u16();

        let mark = Mark::try_from(raw_mark)
            .map_err(|m| KvError::corruption(offset, format!("unknown mark {}", m)))?;

        Ok(Self {
            key_size,
            value_size,
            mark,
        })
    }

    /// Payload length (key + value) that follows the header
    pub fn payload_size(&self) -> u64 {
        self.key_size as u64 + self.value_size as u64
    }

    /// Full record length including the header
    pub fn encoded_size(&self) -> u64 {
        HEADER_SIZE as u64 + self.payload_size()
    }
}

/// A single record in the data file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub mark: Mark,
}

impl Entry {
    /// A live write of `value` under `key`
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            mark: Mark::Put,
        }
    }

    /// A tombstone for `key` (value is always empty)
    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: Vec::new(),
            mark: Mark::Delete,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.mark == Mark::Delete
    }

    /// Header for this entry; fails if a payload doesn't fit its u32 size field
    pub fn header(&self) -> Result<EntryHeader> {
        Ok(EntryHeader {
            key_size: length_field("key", self.key.len())?,
            value_size: length_field("value", self.value.len())?,
            mark: self.mark,
        })
    }

    /// Bytes this entry occupies on disk
    pub fn encoded_size(&self) -> u64 {
        (HEADER_SIZE + self.key.len() + self.value.len()) as u64
    }

    /// Encode as `[key_size][value_size][mark][key][value]`, big-endian header
    pub fn encode(&self) -> Result<BytesMut> {
        let header = self.header()?;

        let mut buf = BytesMut::with_capacity(self.encoded_size() as usize);
        buf.put_u32(header.key_size);
        buf.put_u32(header.value_size);
        buf.put_u16(header.mark as u16);
        buf.put_slice(&self.key);
        buf.put_slice(&self.value);
        Ok(buf)
    }
}

/// Size field for a payload of `len` bytes
fn length_field(field: &'static str, len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| KvError::EntryTooLarge { field, len })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_field_fits_u32() {
        assert_eq!(length_field("key", 0).unwrap(), 0);
        assert_eq!(length_field("value", u32::MAX as usize).unwrap(), u32::MAX);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_length_field_rejects_oversized_payload() {
        let len = u32::MAX as usize + 1;

        match length_field("value", len) {
            Err(KvError::EntryTooLarge { field, len: got }) => {
                assert_eq!(field, "value");
                assert_eq!(got, len);
            }
            other => panic!("expected EntryTooLarge, got {:?}", other),
        }
    }
}
