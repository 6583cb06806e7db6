//! Tests for the data file entry codec
//!
//! These tests verify:
//! - Exact byte layout of encoded records
//! - Header decoding without payload
//! - Rejection of malformed headers

use logkv::datafile::{Entry, EntryHeader, Mark, HEADER_SIZE};
use logkv::KvError;

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_encode_put_layout() {
    let entry = Entry::put(b"ab".to_vec(), b"xyz".to_vec());
    let bytes = entry.encode().unwrap();

    assert_eq!(
        &bytes[..],
        &[0, 0, 0, 2, 0, 0, 0, 3, 0, 0, b'a', b'b', b'x', b'y', b'z']
    );
    assert_eq!(entry.encoded_size(), 15);
}

#[test]
fn test_encode_tombstone_layout() {
    let entry = Entry::delete(b"key".to_vec());
    let bytes = entry.encode().unwrap();

    assert_eq!(&bytes[..], &[0, 0, 0, 3, 0, 0, 0, 0, 0, 1, b'k', b'e', b'y']);
    assert!(entry.is_tombstone());
    assert!(entry.value.is_empty());
}

#[test]
fn test_encode_header_is_big_endian() {
    let entry = Entry::put(vec![7u8; 0x0102], vec![9u8; 0x030405]);
    let bytes = entry.encode().unwrap();

    assert_eq!(&bytes[0..4], &[0x00, 0x00, 0x01, 0x02]);
    assert_eq!(&bytes[4..8], &[0x00, 0x03, 0x04, 0x05]);
    assert_eq!(bytes.len() as u64, HEADER_SIZE as u64 + 0x0102 + 0x030405);
}

#[test]
fn test_encode_empty_value() {
    let entry = Entry::put(b"k".to_vec(), Vec::new());

    assert_eq!(entry.encoded_size(), HEADER_SIZE as u64 + 1);
    assert_eq!(entry.encode().unwrap().len(), HEADER_SIZE + 1);
}

// =============================================================================
// Header Decoding Tests
// =============================================================================

#[test]
fn test_decode_header_matches_entry() {
    let entry = Entry::put(b"hello".to_vec(), b"world!".to_vec());
    let bytes = entry.encode().unwrap();

    let header = EntryHeader::decode(&bytes[..HEADER_SIZE], 0).unwrap();

    assert_eq!(header, entry.header().unwrap());
    assert_eq!(header.key_size, 5);
    assert_eq!(header.value_size, 6);
    assert_eq!(header.mark, Mark::Put);
    assert_eq!(header.encoded_size(), entry.encoded_size());
}

#[test]
fn test_decode_header_ignores_payload() {
    // Header claims a payload that isn't in the buffer; decoding must not care
    let bytes = [0, 0, 0, 4, 0, 0, 1, 0, 0, 1];

    let header = EntryHeader::decode(&bytes, 0).unwrap();

    assert_eq!(header.key_size, 4);
    assert_eq!(header.value_size, 256);
    assert_eq!(header.mark, Mark::Delete);
    assert_eq!(header.payload_size(), 260);
}

#[test]
fn test_decode_header_unknown_mark() {
    let bytes = [0, 0, 0, 1, 0, 0, 0, 1, 0, 2];

    let err = EntryHeader::decode(&bytes, 42).unwrap_err();

    match err {
        KvError::Corruption { offset, .. } => assert_eq!(offset, 42),
        other => panic!("expected corruption, got {:?}", other),
    }
}

#[test]
fn test_decode_header_short_buffer() {
    let err = EntryHeader::decode(&[0, 0, 0, 1], 0).unwrap_err();

    assert!(matches!(err, KvError::Corruption { .. }));
    assert!(err.is_internal());
}

#[test]
fn test_mark_from_raw() {
    assert_eq!(Mark::try_from(0u16), Ok(Mark::Put));
    assert_eq!(Mark::try_from(1u16), Ok(Mark::Delete));
    assert_eq!(Mark::try_from(2u16), Err(2));
}
