//! The record store: one file holding a header region, an index region
//! and a data region, with every operation serialized behind a single
//! store-wide lock.
//!
//! Mutations keep the data region tiled: freed space is folded into a
//! neighboring record or truncated off the file tail, allocation reuses
//! intra-record slack before growing the file, and the index region
//! grows by pushing the leading data record to end-of-file.

use std::path::Path;
use std::sync::Mutex;

use crate::config::{AccessMode, StoreConfig};
use crate::corrupt;
use crate::encoding::{keycode, Value};
use crate::error::{Error, Result};
use crate::file::StoreFile;
use crate::header::RecordHeader;
use crate::index::MemIndex;
use crate::layout;

/// Single-file key-value record store.
///
/// Payloads are opaque bytes addressed by short textual keys. All
/// operations acquire the store lock; byte buffers returned by [`read`]
/// are owned by the caller and outlive it.
///
/// [`read`]: RecordsStore::read
#[derive(Debug)]
pub struct RecordsStore {
    inner: Mutex<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    file: StoreFile,
    index: MemIndex,
    /// Offset of the first byte of the record data region.
    data_start_ptr: u64,
}

impl RecordsStore {
    /// Creates a new store file with index room for `initial_capacity`
    /// records. Fails if the path already exists.
    pub fn create(path: impl AsRef<Path>, initial_capacity: u32) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Err(Error::AlreadyExists(path.to_path_buf()));
        }
        let file = AccessMode::ReadWrite
            .open_options()
            .create(true)
            .open(path)?;
        let mut file = StoreFile::new(file);

        // The data region starts where the slot past the last reserved
        // index entry would begin.
        let data_start_ptr = layout::key_offset(initial_capacity);
        file.set_len(data_start_ptr)?;
        file.write_num_records(0)?;
        file.write_data_start(data_start_ptr)?;
        file.write_reserved()?;

        tracing::info!(path = %path.display(), initial_capacity, "created store");
        Ok(Self {
            inner: Mutex::new(StoreInner {
                file,
                index: MemIndex::with_capacity(initial_capacity as usize),
                data_start_ptr,
            }),
        })
    }

    /// Opens an existing store file and loads its index into memory.
    /// Fails if the path does not exist.
    pub fn open(path: impl AsRef<Path>, access: AccessMode) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        let mut file = StoreFile::new(access.open_options().open(path)?);

        let data_start_ptr = file.read_data_start()?;
        let num_records = file.read_num_records()?;
        let mut index = MemIndex::with_capacity(num_records as usize);
        for slot in 0..num_records {
            let key = file.read_key_at(slot)?;
            let header = file.read_header_at(slot)?;
            index.insert(key, header);
        }

        tracing::info!(path = %path.display(), num_records, "opened store");
        Ok(Self {
            inner: Mutex::new(StoreInner {
                file,
                index,
                data_start_ptr,
            }),
        })
    }

    /// Create with custom configuration
    pub fn create_with_config(path: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        Self::create(path, config.initial_capacity)
    }

    /// Open with custom configuration
    pub fn open_with_config(path: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        Self::open(path, config.access)
    }

    /// Inserts a new record. The key must not be present.
    pub fn insert(&self, key: &str, data: &[u8]) -> Result<()> {
        self.inner.lock().unwrap().insert(key, data)
    }

    /// Rewrites the record under `key`. A payload that no longer fits
    /// the record's reserved space is relocated.
    pub fn update(&self, key: &str, data: &[u8]) -> Result<()> {
        self.inner.lock().unwrap().update(key, data)
    }

    /// Reads the payload stored under `key`.
    pub fn read(&self, key: &str) -> Result<Vec<u8>> {
        self.inner.lock().unwrap().read(key)
    }

    /// Deletes the record under `key`, folding its space back into the
    /// data region.
    pub fn delete(&self, key: &str) -> Result<()> {
        self.inner.lock().unwrap().delete(key)
    }

    /// Whether a record exists under `key`.
    pub fn exists(&self, key: &str) -> bool {
        self.inner.lock().unwrap().index.contains(key)
    }

    /// Number of live records.
    pub fn size(&self) -> usize {
        self.inner.lock().unwrap().index.len()
    }

    /// A snapshot of the live keys, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.inner.lock().unwrap().index.keys().cloned().collect()
    }

    /// Inserts `value` under `key`, encoded with bincode.
    pub fn insert_value<V: Value>(&self, key: &str, value: &V) -> Result<()> {
        self.insert(key, &value.encode()?)
    }

    /// Rewrites the record under `key` with an encoded value.
    pub fn update_value<V: Value>(&self, key: &str, value: &V) -> Result<()> {
        self.update(key, &value.encode()?)
    }

    /// Reads and decodes the value stored under `key`.
    pub fn read_value<V: Value>(&self, key: &str) -> Result<V> {
        V::decode(&self.read(key)?)
    }

    /// Closes the store, flushing OS buffers and dropping the index.
    pub fn close(self) -> Result<()> {
        let inner = self.inner.into_inner().unwrap();
        inner.file.sync()?;
        tracing::info!(num_records = inner.index.len(), "closed store");
        Ok(())
    }

    /// Checks the cross-region invariants: count agreement between the
    /// file header and the in-memory index, slot contiguity against the
    /// on-disk index, data-region tiling and per-record size bounds.
    #[cfg(debug_assertions)]
    pub fn validate(&self) -> Result<()> {
        self.inner.lock().unwrap().validate()
    }
}

impl StoreInner {
    fn insert(&mut self, key: &str, data: &[u8]) -> Result<()> {
        // A rejected key or payload must not leave the file grown, so
        // both are checked before index space is ensured or anything is
        // allocated.
        let encoded_key = keycode::encode(key)?;
        if data.is_empty() || data.len() > u32::MAX as usize {
            return Err(Error::InvalidDataSize(data.len()));
        }
        if self.index.contains(key) {
            return Err(Error::KeyExists(key.to_string()));
        }
        self.ensure_index_space(self.index.len() as u32 + 1)?;
        let mut header = self.allocate(data.len())?;
        self.file.write_payload(&mut header, data)?;
        self.add_index_entry(key, &encoded_key, header)
    }

    fn update(&mut self, key: &str, data: &[u8]) -> Result<()> {
        let mut header = match self.index.get(key) {
            Some(header) => *header,
            None => return Err(Error::KeyNotFound(key.to_string())),
        };
        if data.len() > header.data_capacity as usize {
            // The payload outgrew its reserved space: relocate.
            self.delete(key)?;
            return self.insert(key, data);
        }
        self.file.write_payload(&mut header, data)?;
        self.file.write_header(&header)?;
        self.index.insert(key.to_string(), header);
        Ok(())
    }

    fn read(&mut self, key: &str) -> Result<Vec<u8>> {
        let header = match self.index.get(key) {
            Some(header) => *header,
            None => return Err(Error::KeyNotFound(key.to_string())),
        };
        self.file.read_payload(&header)
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        let target = match self.index.get(key) {
            Some(header) => *header,
            None => return Err(Error::KeyNotFound(key.to_string())),
        };
        let num_records = self.index.len() as u32;
        let target_end = target.data_pointer + target.data_capacity as u64;

        if self.file.len()? == target_end {
            // Tail record: the file shrinks by the whole reserved span.
            self.file.set_len(target.data_pointer)?;
        } else if let Some((prev_key, mut prev)) = self.covering_record(target.data_pointer - 1) {
            // A record ends exactly where the target starts: its capacity
            // absorbs the freed span as trailing slack.
            prev.data_capacity += target.data_capacity;
            self.file.write_header(&prev)?;
            tracing::debug!(key, into = %prev_key, "coalesced freed space into predecessor");
            self.index.insert(prev_key, prev);
        } else if let Some((next_key, mut next)) = self.covering_record(target_end) {
            // Target is first in the data region: the successor slides
            // left over the freed span.
            let data = self.file.read_payload(&next)?;
            next.data_pointer = target.data_pointer;
            next.data_capacity += target.data_capacity;
            self.file.write_payload(&mut next, &data)?;
            self.file.write_header(&next)?;
            tracing::debug!(key, shifted = %next_key, "moved successor over freed space");
            self.index.insert(next_key, next);
        } else {
            return corrupt!(
                "record {key:?} at offset {} is neither the file tail nor adjacent to a live record",
                target.data_pointer
            );
        }
        self.remove_index_entry(key, &target, num_records)
    }

    /// Appends an index entry for a new record in the first unused slot.
    /// Index space must already have been ensured.
    fn add_index_entry(
        &mut self,
        key: &str,
        encoded_key: &[u8],
        mut header: RecordHeader,
    ) -> Result<()> {
        let slot = self.index.len() as u32;
        self.file.write_key_at(slot, encoded_key)?;
        header.index_position = slot;
        self.file.write_header(&header)?;
        self.file.write_num_records(slot + 1)?;
        self.index.insert(key.to_string(), header);
        Ok(())
    }

    /// Removes the target's index entry by overwriting its slot with the
    /// last entry, keeping slots `0..num_records` live.
    fn remove_index_entry(
        &mut self,
        key: &str,
        target: &RecordHeader,
        num_records: u32,
    ) -> Result<()> {
        if target.index_position != num_records - 1 {
            let last_key = self.file.read_key_at(num_records - 1)?;
            let mut last = match self.index.get(&last_key) {
                Some(header) => *header,
                None => {
                    return corrupt!(
                        "index slot {} holds unknown key {last_key:?}",
                        num_records - 1
                    )
                }
            };
            last.index_position = target.index_position;
            let encoded_key = keycode::encode(&last_key)?;
            self.file.write_key_at(last.index_position, &encoded_key)?;
            self.file.write_header(&last)?;
            self.index.insert(last_key, last);
        }
        self.file.write_num_records(num_records - 1)?;
        self.index.remove(key);
        Ok(())
    }

    /// Finds space for a payload of `data_len` bytes: the free tail of an
    /// existing record if one is large enough, the end of the file
    /// otherwise.
    fn allocate(&mut self, data_len: usize) -> Result<RecordHeader> {
        if data_len == 0 || data_len > u32::MAX as usize {
            return Err(Error::InvalidDataSize(data_len));
        }

        let donor_key = self
            .index
            .iter()
            .find(|(_, header)| header.free_space() as usize >= data_len)
            .map(|(key, _)| key.clone());
        if let Some(donor_key) = donor_key {
            if let Some(donor) = self.index.get_mut(&donor_key) {
                let header = donor.split()?;
                self.file.write_header(donor)?;
                tracing::debug!(donor = %donor_key, capacity = header.data_capacity, "split record free space");
                return Ok(header);
            }
        }

        let file_len = self.file.len()?;
        self.file.set_len(file_len + data_len as u64)?;
        RecordHeader::new(file_len, data_len as u32)
    }

    /// Makes sure the index region can hold `required_slots` entries,
    /// relocating records out of its way as needed.
    fn ensure_index_space(&mut self, required_slots: u32) -> Result<()> {
        let end_index_ptr = layout::key_offset(required_slots);
        if end_index_ptr > self.file.len()? && self.index.is_empty() {
            self.file.set_len(end_index_ptr)?;
            self.data_start_ptr = end_index_ptr;
            self.file.write_data_start(end_index_ptr)?;
            return Ok(());
        }
        while end_index_ptr > self.data_start_ptr {
            let (first_key, mut first) = match self.covering_record(self.data_start_ptr) {
                Some(found) => found,
                // The data region holds no record at its start; nothing
                // blocks the index.
                None => return Ok(()),
            };
            let data = self.file.read_payload(&first)?;
            first.data_pointer = self.file.len()?;

            // The capacity must be captured before it is tightened to the
            // live size; the region advances by the full original span.
            let original_capacity = first.data_capacity;
            first.data_capacity = first.data_size;
            self.file.set_len(first.data_pointer + first.data_size as u64)?;
            self.file.write_payload(&mut first, &data)?;
            self.file.write_header(&first)?;
            tracing::debug!(
                record = %first_key,
                new_pointer = first.data_pointer,
                "relocated record to grow index region"
            );
            self.index.insert(first_key, first);

            self.data_start_ptr += original_capacity as u64;
            self.file.write_data_start(self.data_start_ptr)?;
        }
        Ok(())
    }

    /// The key and header of the record covering the given file offset.
    fn covering_record(&self, offset: u64) -> Option<(String, RecordHeader)> {
        self.index
            .covering(offset)
            .map(|(key, header)| (key.clone(), *header))
    }

    #[cfg(debug_assertions)]
    fn validate(&mut self) -> Result<()> {
        let num_records = self.file.read_num_records()?;
        if num_records as usize != self.index.len() {
            return corrupt!(
                "file header counts {num_records} records, index holds {}",
                self.index.len()
            );
        }
        if self.data_start_ptr < layout::key_offset(num_records) {
            return corrupt!("data region overlaps the index");
        }

        for slot in 0..num_records {
            let key = self.file.read_key_at(slot)?;
            let header = self.file.read_header_at(slot)?;
            match self.index.get(&key) {
                Some(in_memory) if *in_memory == header => {}
                Some(in_memory) => {
                    return corrupt!(
                        "slot {slot} header mismatch for {key:?}: disk {header:?}, memory {in_memory:?}"
                    )
                }
                None => return corrupt!("slot {slot} key {key:?} missing from the in-memory index"),
            }
        }

        let mut spans: Vec<(u64, u64)> = self
            .index
            .iter()
            .map(|(_, header)| {
                (
                    header.data_pointer,
                    header.data_pointer + header.data_capacity as u64,
                )
            })
            .collect();
        spans.sort_unstable();
        let mut cursor = self.data_start_ptr;
        for (start, end) in spans {
            if start != cursor {
                return corrupt!("tiling broken: expected a record at {cursor}, found {start}");
            }
            cursor = end;
        }
        let file_len = self.file.len()?;
        if cursor != file_len {
            return corrupt!("data region ends at {cursor}, file ends at {file_len}");
        }

        for (key, header) in self.index.iter() {
            if header.data_size > header.data_capacity {
                return corrupt!(
                    "record {key:?} size {} exceeds capacity {}",
                    header.data_size,
                    header.data_capacity
                );
            }
        }
        Ok(())
    }
}
