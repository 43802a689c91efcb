//! On-disk layout of a store file.
//!
//! A store file holds three contiguous regions:
//!
//! ```text
//! file header    ========================
//!                | num records    (i32) |
//!                | data start ptr (u64) |
//!                | reserved             |
//! index          ========================
//!                | key 0 | header 0     |
//!                | key 1 | header 1     |
//!                | ...                  |
//!                | unused slots         |
//! record data    ========================  <- data start ptr
//!                | payload 0            |
//!                | payload 1            |
//!                | ...                  |
//! EOF            ========================
//! ```
//!
//! All multi-byte integers are big-endian. The index entries in slots
//! `0..num_records` are live; the data region is tiled by each record's
//! reserved capacity with no gaps between neighbors.

/// Total length in bytes of the file header region.
pub const FILE_HEADER_LEN: u64 = 16;

/// Number of persisted bytes in one record header.
pub const RECORD_HEADER_LEN: usize = 16;

/// Space reserved for one encoded key in an index slot, length prefix
/// included.
pub const MAX_KEY_LEN: usize = 64;

/// One index entry: the key slot followed by the record header.
pub const INDEX_ENTRY_LEN: u64 = (MAX_KEY_LEN + RECORD_HEADER_LEN) as u64;

/// File offset of the num-records header field.
pub const NUM_RECORDS_OFFSET: u64 = 0;

/// File offset of the data-start pointer header field.
pub const DATA_START_OFFSET: u64 = 4;

/// File offset of the reserved file-header bytes.
pub const RESERVED_OFFSET: u64 = 12;

/// Number of reserved file-header bytes. Zeroed on create, never read.
pub const RESERVED_LEN: usize = 4;

/// File offset of the first key byte in the given index slot.
pub fn key_offset(slot: u32) -> u64 {
    FILE_HEADER_LEN + INDEX_ENTRY_LEN * slot as u64
}

/// File offset of the first record-header byte in the given index slot.
pub fn header_offset(slot: u32) -> u64 {
    key_offset(slot) + MAX_KEY_LEN as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_offsets() {
        assert_eq!(key_offset(0), 16);
        assert_eq!(header_offset(0), 80);
        assert_eq!(key_offset(1), 96);
        assert_eq!(header_offset(1), 160);
        assert_eq!(key_offset(2), key_offset(1) + INDEX_ENTRY_LEN);
    }

    #[test]
    fn test_region_lengths() {
        assert_eq!(INDEX_ENTRY_LEN, 80);
        assert_eq!(RESERVED_OFFSET + RESERVED_LEN as u64, FILE_HEADER_LEN);
    }
}
