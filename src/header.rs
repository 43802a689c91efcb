use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};

/// Metadata for one record: where its payload lives, how much space is
/// reserved for it and how much of that space is in use.
///
/// The three persisted fields occupy the last 16 bytes of an index
/// entry. `index_position` is never written; it is derived from the slot
/// a header was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// File offset of the first payload byte.
    pub data_pointer: u64,
    /// Bytes reserved for this record in the data region.
    pub data_capacity: u32,
    /// Bytes currently used.
    pub data_size: u32,
    /// Slot of this record in the on-disk index.
    pub index_position: u32,
}

impl RecordHeader {
    /// Creates a header for freshly allocated space. The reserved span
    /// of an allocated record is never empty.
    pub fn new(data_pointer: u64, data_capacity: u32) -> Result<Self> {
        if data_capacity < 1 {
            return Err(Error::InvalidDataSize(data_capacity as usize));
        }
        Ok(Self {
            data_pointer,
            data_capacity,
            data_size: 0,
            index_position: 0,
        })
    }

    /// Trailing slack that may be handed to another record.
    pub fn free_space(&self) -> u32 {
        self.data_capacity - self.data_size
    }

    /// Carves this record's free space into a new record starting right
    /// after the live bytes, tightening this record to its used size.
    pub fn split(&mut self) -> Result<RecordHeader> {
        let carved = RecordHeader::new(self.data_pointer + self.data_size as u64, self.free_space())?;
        self.data_capacity = self.data_size;
        Ok(carved)
    }

    /// Reads the persisted header fields from the reader's current
    /// position.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let data_pointer = reader.read_u64::<BigEndian>()?;
        let data_capacity = reader.read_u32::<BigEndian>()?;
        let data_size = reader.read_u32::<BigEndian>()?;
        Ok(Self {
            data_pointer,
            data_capacity,
            data_size,
            index_position: 0,
        })
    }

    /// Writes the persisted header fields at the writer's current
    /// position.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u64::<BigEndian>(self.data_pointer)?;
        writer.write_u32::<BigEndian>(self.data_capacity)?;
        writer.write_u32::<BigEndian>(self.data_size)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::RECORD_HEADER_LEN;

    #[test]
    fn test_header_round_trip() {
        let header = RecordHeader {
            data_pointer: 176,
            data_capacity: 42,
            data_size: 17,
            index_position: 3,
        };

        let mut buf = Vec::new();
        header.write_to(&mut buf).expect("encode failed");
        assert_eq!(buf.len(), RECORD_HEADER_LEN);

        let decoded = RecordHeader::read_from(&mut buf.as_slice()).expect("decode failed");
        assert_eq!(decoded.data_pointer, header.data_pointer);
        assert_eq!(decoded.data_capacity, header.data_capacity);
        assert_eq!(decoded.data_size, header.data_size);
        // The slot ordinal is not part of the wire format.
        assert_eq!(decoded.index_position, 0);
    }

    #[test]
    fn test_new_rejects_empty_capacity() {
        assert!(RecordHeader::new(16, 0).is_err());
        assert!(RecordHeader::new(16, 1).is_ok());
    }

    #[test]
    fn test_split_carves_free_space() {
        let mut donor = RecordHeader::new(100, 10).expect("bad header");
        donor.data_size = 4;
        assert_eq!(donor.free_space(), 6);

        let carved = donor.split().expect("split failed");
        assert_eq!(carved.data_pointer, 104);
        assert_eq!(carved.data_capacity, 6);
        assert_eq!(carved.data_size, 0);

        assert_eq!(donor.data_capacity, 4);
        assert_eq!(donor.free_space(), 0);
    }
}
