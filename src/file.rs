//! Random-access primitives over the store file.
//!
//! Every helper seeks to the region it touches before reading or
//! writing; callers never position the file themselves.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::corrupt;
use crate::encoding::keycode;
use crate::error::{Error, Result};
use crate::header::RecordHeader;
use crate::layout::{self, DATA_START_OFFSET, NUM_RECORDS_OFFSET, RESERVED_LEN, RESERVED_OFFSET};

/// The store file with seek-and-access helpers for the three regions.
#[derive(Debug)]
pub struct StoreFile {
    file: File,
}

impl StoreFile {
    pub fn new(file: File) -> Self {
        Self { file }
    }

    pub fn len(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    pub fn set_len(&self, len: u64) -> Result<()> {
        Ok(self.file.set_len(len)?)
    }

    /// Live-record count from the file header.
    pub fn read_num_records(&mut self) -> Result<u32> {
        self.file.seek(SeekFrom::Start(NUM_RECORDS_OFFSET))?;
        let num_records = self.file.read_i32::<BigEndian>()?;
        if num_records < 0 {
            return corrupt!("negative record count {num_records}");
        }
        Ok(num_records as u32)
    }

    pub fn write_num_records(&mut self, num_records: u32) -> Result<()> {
        self.file.seek(SeekFrom::Start(NUM_RECORDS_OFFSET))?;
        self.file.write_i32::<BigEndian>(num_records as i32)?;
        Ok(())
    }

    /// Offset of the first byte of the record data region.
    pub fn read_data_start(&mut self) -> Result<u64> {
        self.file.seek(SeekFrom::Start(DATA_START_OFFSET))?;
        Ok(self.file.read_u64::<BigEndian>()?)
    }

    pub fn write_data_start(&mut self, data_start_ptr: u64) -> Result<()> {
        self.file.seek(SeekFrom::Start(DATA_START_OFFSET))?;
        self.file.write_u64::<BigEndian>(data_start_ptr)?;
        Ok(())
    }

    /// Zeroes the reserved tail of the file header.
    pub fn write_reserved(&mut self) -> Result<()> {
        self.file.seek(SeekFrom::Start(RESERVED_OFFSET))?;
        self.file.write_all(&[0u8; RESERVED_LEN])?;
        Ok(())
    }

    /// Reads the key stored in the given index slot.
    pub fn read_key_at(&mut self, slot: u32) -> Result<String> {
        self.file.seek(SeekFrom::Start(layout::key_offset(slot)))?;
        keycode::decode(&mut self.file)
    }

    /// Writes a pre-encoded key into the given index slot.
    pub fn write_key_at(&mut self, slot: u32, encoded_key: &[u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(layout::key_offset(slot)))?;
        self.file.write_all(encoded_key)?;
        Ok(())
    }

    /// Reads the record header in the given index slot. The header's
    /// position is taken from the slot it was read from.
    pub fn read_header_at(&mut self, slot: u32) -> Result<RecordHeader> {
        self.file.seek(SeekFrom::Start(layout::header_offset(slot)))?;
        let mut header = RecordHeader::read_from(&mut self.file)?;
        header.index_position = slot;
        Ok(header)
    }

    /// Rewrites a record header in its index slot.
    pub fn write_header(&mut self, header: &RecordHeader) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(layout::header_offset(header.index_position)))?;
        header.write_to(&mut self.file)
    }

    /// Reads a record's live payload bytes.
    pub fn read_payload(&mut self, header: &RecordHeader) -> Result<Vec<u8>> {
        let mut data = vec![0u8; header.data_size as usize];
        self.file.seek(SeekFrom::Start(header.data_pointer))?;
        self.file.read_exact(&mut data)?;
        Ok(data)
    }

    /// Writes a payload into the record's reserved space and updates the
    /// header's size in memory. The header bytes are not rewritten here;
    /// that is the caller's step.
    pub fn write_payload(&mut self, header: &mut RecordHeader, data: &[u8]) -> Result<()> {
        if data.len() > header.data_capacity as usize {
            return Err(Error::RecordDoesNotFit {
                size: data.len(),
                capacity: header.data_capacity,
            });
        }
        header.data_size = data.len() as u32;
        self.file.seek(SeekFrom::Start(header.data_pointer))?;
        self.file.write_all(data)?;
        Ok(())
    }

    /// Flushes file content and metadata to disk.
    pub fn sync(&self) -> Result<()> {
        Ok(self.file.sync_all()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::keycode;
    use crate::layout::FILE_HEADER_LEN;
    use tempfile::tempfile;

    fn empty_store_file(len: u64) -> StoreFile {
        let file = tempfile().expect("failed to create temp file");
        let store_file = StoreFile::new(file);
        store_file.set_len(len).expect("failed to size file");
        store_file
    }

    #[test]
    fn test_file_header_fields() {
        let mut file = empty_store_file(FILE_HEADER_LEN);

        file.write_num_records(7).unwrap();
        file.write_data_start(176).unwrap();
        file.write_reserved().unwrap();

        assert_eq!(file.read_num_records().unwrap(), 7);
        assert_eq!(file.read_data_start().unwrap(), 176);
    }

    #[test]
    fn test_negative_record_count_is_corrupt() {
        let mut file = empty_store_file(FILE_HEADER_LEN);
        file.file.seek(SeekFrom::Start(NUM_RECORDS_OFFSET)).unwrap();
        file.file.write_i32::<BigEndian>(-1).unwrap();

        assert!(matches!(file.read_num_records(), Err(Error::Corrupt(_))));
    }

    #[test]
    fn test_index_slot_round_trip() {
        let mut file = empty_store_file(layout::key_offset(2));

        let encoded = keycode::encode("widget").unwrap();
        file.write_key_at(1, &encoded).unwrap();

        let mut header = RecordHeader::new(500, 12).unwrap();
        header.data_size = 4;
        header.index_position = 1;
        file.write_header(&header).unwrap();

        assert_eq!(file.read_key_at(1).unwrap(), "widget");
        let read_back = file.read_header_at(1).unwrap();
        assert_eq!(read_back, header);
    }

    #[test]
    fn test_payload_round_trip() {
        let mut file = empty_store_file(110);

        let mut header = RecordHeader::new(100, 10).unwrap();
        file.write_payload(&mut header, &[1, 2, 3]).unwrap();
        assert_eq!(header.data_size, 3);

        assert_eq!(file.read_payload(&header).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_payload_overflow_is_a_bug_signal() {
        let mut file = empty_store_file(105);

        let mut header = RecordHeader::new(100, 2).unwrap();
        let result = file.write_payload(&mut header, &[1, 2, 3]);
        assert!(matches!(result, Err(Error::RecordDoesNotFit { .. })));
        // The header is untouched on failure.
        assert_eq!(header.data_size, 0);
    }
}
