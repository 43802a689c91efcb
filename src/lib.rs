//! Single-file embedded key-value record store.
//!
//! A store file holds a fixed header, an index of fixed-width entries
//! mirrored by an in-memory map, and a data region tiled by record
//! payloads. Free space is recovered in place: deleted spans coalesce
//! into neighboring records or truncate off the file tail, allocation
//! splits intra-record slack before growing the file, and the index
//! region grows by relocating the leading data record to end-of-file.

pub mod config;
pub mod encoding;
pub mod error;
pub mod file;
pub mod header;
pub mod index;
pub mod layout;
pub mod store;

pub use config::{AccessMode, StoreConfig};
pub use error::{Error, Result};
pub use store::RecordsStore;
