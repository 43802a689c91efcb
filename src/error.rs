use std::fmt::Display;
use std::io;
use std::path::PathBuf;

/// Record store errors.
#[derive(Debug)]
pub enum Error {
    /// Creating a store over a path that already exists.
    AlreadyExists(PathBuf),
    /// Opening a store path that does not exist.
    NotFound(PathBuf),
    /// Inserting a key that is already present.
    KeyExists(String),
    /// Reading, updating or deleting an absent key.
    KeyNotFound(String),
    /// The encoded key (length prefix included) does not fit an index slot.
    KeyTooLarge(usize),
    /// A record cannot be allocated with the requested payload size.
    InvalidDataSize(usize),
    /// The allocator handed out a record smaller than the payload. This is
    /// always a bug, never a caller error.
    RecordDoesNotFit { size: usize, capacity: u32 },
    /// Internal consistency failure, typically a broken data-region tiling
    /// or undecodable index bytes.
    Corrupt(String),
    /// An underlying file-system failure.
    Io(io::Error),
}

impl std::error::Error for Error {}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::AlreadyExists(path) => write!(f, "store already exists: {}", path.display()),
            Error::NotFound(path) => write!(f, "store not found: {}", path.display()),
            Error::KeyExists(key) => write!(f, "key exists: {key}"),
            Error::KeyNotFound(key) => write!(f, "key not found: {key}"),
            Error::KeyTooLarge(len) => {
                write!(f, "encoded key is {len} bytes, larger than the permitted 64")
            }
            Error::InvalidDataSize(len) => write!(f, "invalid record data size: {len}"),
            Error::RecordDoesNotFit { size, capacity } => {
                write!(f, "record data of {size} bytes does not fit capacity {capacity}")
            }
            Error::Corrupt(msg) => write!(f, "store corrupt: {msg}"),
            Error::Io(err) => write!(f, "io error: {err}"),
        }
    }
}

/// Constructs an Error::Corrupt from the given format string.
#[macro_export]
macro_rules! corrupt {
    ($($args:tt)*) => { $crate::error::Error::Corrupt(format!($($args)*)).into() };
}

/// A record store Result returning Error.
pub type Result<T> = std::result::Result<T, Error>;

impl<T> From<Error> for Result<T> {
    fn from(error: Error) -> Self {
        Err(error)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}
